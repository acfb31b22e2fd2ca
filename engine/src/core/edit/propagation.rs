//! Timing Propagation
//!
//! Re-resolves timing after a structural change: the touched lanes are
//! re-flowed forward from the mutation point, then the cached timeline end
//! is recomputed and, if it moved, every end-length clip is refit.

use tracing::{debug, warn};

use crate::core::{
    edit::state::EditState,
    events::EditEvent,
    timing::{calculate_timeline_end, reflow_track, TimedClip},
    TimeMs,
};

impl EditState {
    fn lane_timing(&self, track: usize) -> Vec<TimedClip> {
        let Some(lane) = self.tracks.get(track) else {
            return Vec::new();
        };
        lane.clips
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|slot| TimedClip::new(slot.player.timing_intent(), slot.player.resolved_timing()))
            .collect()
    }

    /// Re-flows one lane from `from`. Returns true if any clip changed.
    fn reflow_lane(&mut self, track: usize, from: usize) -> bool {
        let mut clips = self.lane_timing(track);
        let Some(lane) = self.tracks.get(track) else {
            return false;
        };
        if clips.len() != lane.clips.len() {
            warn!(track, "Lane references players missing from the arena");
            return false;
        }

        let from = from.min(clips.len());
        if !reflow_track(&mut clips, from, self.timeline_end) {
            return false;
        }

        for (id, clip) in lane.clips.iter().zip(&clips).skip(from) {
            if let Some(slot) = self.players.get_mut(id) {
                if slot.player.resolved_timing() != clip.timing {
                    slot.player.set_resolved_timing(clip.timing);
                }
            }
        }
        true
    }

    /// Re-flows the touched lanes, then refreshes the timeline end, the
    /// total duration and notifies listeners once
    pub fn propagate(&mut self, touched: &[(usize, usize)]) {
        for &(track, from) in touched {
            self.reflow_lane(track, from);
        }
        self.refresh_timeline();
    }

    /// Recomputes the timeline end and refits end-length clips when it moved
    /// beyond the tolerance from the end they were last fitted against
    pub fn refresh_timeline(&mut self) {
        let timed: Vec<Vec<TimedClip>> = (0..self.tracks.len())
            .map(|track| self.lane_timing(track))
            .collect();
        let end = calculate_timeline_end(&timed);

        if (end - self.timeline_end).abs() > self.settings.timeline_tolerance_ms {
            self.timeline_end = end;
            debug!(timeline_end = end, "Timeline end changed, refitting end-length clips");
            for track in 0..self.tracks.len() {
                let first_end = self.tracks[track]
                    .clips
                    .iter()
                    .position(|id| self.end_length.contains(id));
                if let Some(first_end) = first_end {
                    self.reflow_lane(track, first_end);
                }
            }
        }

        self.update_total_duration();
        self.events.emit(EditEvent::TimelineUpdated {
            timeline_end: self.timeline_end,
            total_duration: self.total_duration,
        });
    }

    /// Maximum end over every linked clip
    pub fn compute_total_duration(&self) -> TimeMs {
        self.tracks
            .iter()
            .flat_map(|lane| lane.clips.iter())
            .filter_map(|id| self.players.get(id))
            .map(|slot| slot.player.end())
            .fold(0.0, f64::max)
    }

    /// Updates the aggregate duration, emitting `duration:changed` only when
    /// it differs
    pub fn update_total_duration(&mut self) {
        let duration = self.compute_total_duration();
        if duration != self.total_duration {
            self.total_duration = duration;
            self.events.emit(EditEvent::DurationChanged { duration });
        }
    }
}
