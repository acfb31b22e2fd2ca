//! Resolution Pipeline
//!
//! Resolves a whole timeline at load time in two phases:
//!
//! 1. Per clip, in track order: start via the auto-chain, length from the
//!    literal, the duration probe, or a zero placeholder for `"end"`.
//! 2. Globally: compute the timeline end from phase-1 results, then fit every
//!    `"end"` clip (and the auto clips chained behind it).
//!
//! Phase 2 needs the maximum over everything phase 1 produced, so the order
//! is fixed.

use tracing::debug;

use crate::core::{
    sec_to_ms,
    timeline::TrackConfig,
    timing::{
        calculate_timeline_end, reflow_track, resolve_auto_length, resolve_auto_start,
        AssetProbe, LengthIntent, ResolvedTiming, StartIntent, TimedClip,
    },
    TimeMs,
};

/// Result of resolving a timeline
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTimeline {
    /// Resolved timing per track, per clip
    pub tracks: Vec<Vec<ResolvedTiming>>,
    /// Maximum end over clips that do not depend on it
    pub timeline_end: TimeMs,
}

impl ResolvedTimeline {
    /// Maximum end over every clip, including end-length clips
    pub fn duration(&self) -> TimeMs {
        self.tracks
            .iter()
            .flatten()
            .map(ResolvedTiming::end)
            .fold(0.0, f64::max)
    }
}

/// Resolves every clip of `tracks`.
///
/// Probes run one clip at a time in track order, so resolution order is
/// deterministic.
pub async fn resolve_timeline(tracks: &[TrackConfig], probe: &dyn AssetProbe) -> ResolvedTimeline {
    // Phase 1: per-clip resolution
    let mut timed: Vec<Vec<TimedClip>> = Vec::with_capacity(tracks.len());
    for track in tracks {
        let mut resolved: Vec<ResolvedTiming> = Vec::with_capacity(track.clips.len());
        let mut clips = Vec::with_capacity(track.clips.len());

        for (index, clip) in track.clips.iter().enumerate() {
            let start = match clip.start {
                StartIntent::Auto => resolve_auto_start(&resolved, index),
                StartIntent::Seconds(sec) => sec_to_ms(sec),
            };
            let length = match clip.length {
                LengthIntent::Seconds(sec) => sec_to_ms(sec),
                LengthIntent::Auto => resolve_auto_length(&clip.asset, probe).await,
                LengthIntent::End => 0.0,
            };

            let timing = ResolvedTiming::new(start, length);
            resolved.push(timing);
            clips.push(TimedClip::new(clip.timing_intent(), timing));
        }

        timed.push(clips);
    }

    // Phase 2: end-length fixup
    let timeline_end = calculate_timeline_end(&timed);
    for track in &mut timed {
        if let Some(first_end) = track.iter().position(|c| c.intent.length.is_end()) {
            reflow_track(track, first_end, timeline_end);
        }
    }

    debug!(
        tracks = timed.len(),
        timeline_end, "Resolved timeline timing"
    );

    ResolvedTimeline {
        tracks: timed
            .into_iter()
            .map(|track| track.into_iter().map(|c| c.timing).collect())
            .collect(),
        timeline_end,
    }
}
