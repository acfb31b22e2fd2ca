//! Command Context
//!
//! The only surface through which commands read and mutate edit state.

use crate::core::{
    edit::state::EditState,
    events::EditEvent,
    players::{ClipSnapshot, Player},
    settings::EditSettings,
    timing::ResolvedTiming,
    CoreResult, PlayerId, TimeMs, TrackId,
};

/// Mutable view of the edit handed to a command for one execute/undo/redo
pub struct CommandContext<'a> {
    state: &'a mut EditState,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(state: &'a mut EditState) -> Self {
        Self { state }
    }

    // =========================================================================
    // Tracks and Clips
    // =========================================================================

    pub fn track_count(&self) -> usize {
        self.state.tracks.len()
    }

    pub fn track_id(&self, track: usize) -> CoreResult<TrackId> {
        Ok(self.state.track(track)?.id.clone())
    }

    /// Player ids on a track, in order
    pub fn track_clips(&self, track: usize) -> CoreResult<&[PlayerId]> {
        Ok(&self.state.track(track)?.clips)
    }

    pub fn clip_id_at(&self, track: usize, clip: usize) -> CoreResult<PlayerId> {
        self.state.clip_id_at(track, clip)
    }

    /// Track and clip index of a linked player
    pub fn locate(&self, id: &str) -> Option<(usize, usize)> {
        self.state.locate(id)
    }

    pub fn player(&self, id: &str) -> CoreResult<&dyn Player> {
        self.state.player(id)
    }

    pub fn resolved_timing(&self, id: &str) -> CoreResult<ResolvedTiming> {
        Ok(self.state.player(id)?.resolved_timing())
    }

    /// Deep copy of a player's configuration and bindings
    pub fn snapshot(&self, id: &str) -> CoreResult<ClipSnapshot> {
        Ok(ClipSnapshot::of(self.state.player(id)?))
    }

    // =========================================================================
    // Structural Changes
    // =========================================================================

    pub fn insert_track(&mut self, index: usize, id: Option<TrackId>) -> CoreResult<TrackId> {
        self.state.insert_track(index, id)
    }

    /// Removes an empty track and its container
    pub fn remove_track(&mut self, index: usize) -> CoreResult<TrackId> {
        Ok(self.state.remove_track(index)?.id)
    }

    /// Creates (or revives) a player at `track`/`index`, mounts it and
    /// schedules its load
    pub fn spawn_player(
        &mut self,
        track: usize,
        index: usize,
        id: Option<PlayerId>,
        snapshot: ClipSnapshot,
    ) -> CoreResult<PlayerId> {
        self.state.spawn_player(track, index, id, snapshot)
    }

    /// Unlinks a player and queues it for disposal. Returns where it was.
    pub fn queue_disposal(&mut self, id: &str) -> CoreResult<(usize, usize)> {
        self.state.queue_disposal(id)
    }

    /// Moves a player between positions/tracks. Returns where it was.
    pub fn move_player(
        &mut self,
        id: &str,
        to_track: usize,
        to_index: usize,
    ) -> CoreResult<(usize, usize)> {
        self.state.move_player(id, to_track, to_index)
    }

    /// Replaces a player's configuration and bindings
    pub fn reconfigure(&mut self, id: &str, snapshot: ClipSnapshot) -> CoreResult<()> {
        self.state.reconfigure(id, snapshot)
    }

    /// Restores a configuration and resolved timing captured before a change,
    /// then lets the player rebuild its derived state
    pub fn restore(&mut self, id: &str, snapshot: ClipSnapshot, timing: ResolvedTiming) -> CoreResult<()> {
        self.state.reconfigure(id, snapshot)?;
        let player = self.state.player_mut(id)?;
        player.set_resolved_timing(timing);
        player.reconfigure_after_restore();
        Ok(())
    }

    /// Restarts a player's load, optionally measuring its auto length
    pub fn schedule_load(&mut self, id: &str, probe_auto: bool) {
        self.state.schedule_load(id, probe_auto);
    }

    // =========================================================================
    // Selection / Events / Timing
    // =========================================================================

    pub fn selection(&self) -> Option<&PlayerId> {
        self.state.selection.as_ref()
    }

    pub fn set_selection(&mut self, id: Option<PlayerId>) {
        self.state.selection = id;
    }

    pub fn emit(&mut self, event: EditEvent) {
        self.state.emit(event);
    }

    /// Re-flows the touched `(track, from)` positions and refreshes the
    /// timeline end and total duration
    pub fn propagate(&mut self, touched: &[(usize, usize)]) {
        self.state.propagate(touched);
    }

    pub fn timeline_end(&self) -> TimeMs {
        self.state.timeline_end
    }

    pub fn settings(&self) -> &EditSettings {
        &self.state.settings
    }
}
