//! Timing Resolver
//!
//! Pure functions turning timing intent into resolved milliseconds.
//!
//! The dependency graph is kept acyclic by one rule: the timeline end is a
//! function of fixed and auto clips only. `"end"` clips, and auto-start clips
//! chained behind them, consume the timeline end and never feed it.

use tracing::debug;

use crate::core::{
    sec_to_ms,
    timeline::Asset,
    timing::{AssetProbe, LengthIntent, ResolvedTiming, StartIntent, TimingIntent},
    TimeMs,
};

/// Length assigned when an auto length cannot be probed (3 seconds)
pub const DEFAULT_AUTO_LENGTH_MS: TimeMs = 3000.0;

/// A clip's intent together with its current resolution
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedClip {
    pub intent: TimingIntent,
    pub timing: ResolvedTiming,
}

impl TimedClip {
    pub fn new(intent: TimingIntent, timing: ResolvedTiming) -> Self {
        Self { intent, timing }
    }
}

/// Start of clip `index` when its start is `"auto"`
pub fn resolve_auto_start(track: &[ResolvedTiming], index: usize) -> TimeMs {
    if index == 0 {
        return 0.0;
    }
    track.get(index - 1).map_or(0.0, ResolvedTiming::end)
}

/// Length of a clip whose length is `"end"`
pub fn resolve_end_length(start: TimeMs, timeline_end: TimeMs) -> TimeMs {
    (timeline_end - start).max(0.0)
}

/// Length of a clip whose length is `"auto"`.
///
/// Probeable media is measured and the trim subtracted. Anything that cannot
/// be measured gets [`DEFAULT_AUTO_LENGTH_MS`]; this never fails.
pub async fn resolve_auto_length(asset: &Asset, probe: &dyn AssetProbe) -> TimeMs {
    let Some(src) = asset.probe_source() else {
        return DEFAULT_AUTO_LENGTH_MS;
    };

    match probe.probe_duration(src).await {
        Some(duration) if duration.is_finite() => {
            let remaining = duration - asset.trim().unwrap_or(0.0);
            if remaining > 0.0 {
                sec_to_ms(remaining)
            } else {
                debug!(src, duration, "Trim exceeds probed duration, using default length");
                DEFAULT_AUTO_LENGTH_MS
            }
        }
        _ => {
            debug!(src, "Duration probe failed, using default length");
            DEFAULT_AUTO_LENGTH_MS
        }
    }
}

/// Maximum resolved end over clips that do not depend on the timeline end
pub fn calculate_timeline_end<T: AsRef<[TimedClip]>>(tracks: &[T]) -> TimeMs {
    let mut end: TimeMs = 0.0;
    for track in tracks {
        let mut downstream_of_end = false;
        for clip in track.as_ref() {
            match clip.intent.start {
                StartIntent::Seconds(_) => downstream_of_end = false,
                StartIntent::Auto => {}
            }
            if clip.intent.length.is_end() {
                downstream_of_end = true;
                continue;
            }
            if !downstream_of_end {
                end = end.max(clip.timing.end());
            }
        }
    }
    end
}

/// Re-derives the timing of `track[from..]` from intent.
///
/// Fixed values come straight from the intent, auto starts follow the
/// previous sibling, end lengths fill to `timeline_end`, and auto lengths keep
/// their measured value (or the default when none has been measured yet).
/// Returns true if any clip changed.
pub fn reflow_track(track: &mut [TimedClip], from: usize, timeline_end: TimeMs) -> bool {
    let mut changed = false;
    let mut timings: Vec<ResolvedTiming> = track.iter().map(|c| c.timing).collect();

    for index in from..track.len() {
        let clip = &mut track[index];
        let start = match clip.intent.start {
            StartIntent::Auto => resolve_auto_start(&timings, index),
            StartIntent::Seconds(sec) => sec_to_ms(sec),
        };
        let length = match clip.intent.length {
            LengthIntent::Seconds(sec) => sec_to_ms(sec),
            LengthIntent::End => resolve_end_length(start, timeline_end),
            LengthIntent::Auto if clip.timing.length > 0.0 => clip.timing.length,
            LengthIntent::Auto => DEFAULT_AUTO_LENGTH_MS,
        };

        let resolved = ResolvedTiming::new(start, length);
        if resolved != clip.timing {
            clip.timing = resolved;
            changed = true;
        }
        timings[index] = resolved;
    }

    changed
}

// =============================================================================
// Tests
// =============================================================================
