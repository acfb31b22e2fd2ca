//! Edit Orchestrator
//!
//! [`Edit`] owns the player arena, the track lanes, the command history and
//! the playback clock. Every mutation is a command executed through
//! [`Edit::execute_command`]; the convenience methods only build commands.

mod propagation;
pub(crate) mod state;

pub use state::TrackLane;

use std::rc::Rc;

use futures::StreamExt;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::core::{
    commands::{
        AddClipCommand, AddTrackCommand, ClearSelectionCommand, Command, CommandContext,
        CommandHistory, CommandResult, DeleteClipCommand, DeleteTrackCommand, MoveClipCommand,
        SelectClipCommand, SetUpdatedClipCommand, SplitClipCommand, UpdateTextContentCommand,
    },
    events::{EditEvent, EventHandler},
    players::{
        apply_merge_fields, restore_placeholders, AssetLoader, FieldBindings, Player,
        PlayerFactory, StandardPlayerFactory,
    },
    scene::{SceneGraph, SceneTree},
    settings::EditSettings,
    timeline::{
        ClipConfig, EditDocument, MergeField, OutputConfig, TimelineConfig, TrackConfig,
    },
    timing::{resolve_timeline, AssetProbe, NullProbe},
    CoreError, CoreResult, HandlerId, PlayerId, TimeMs, TimeSec, TrackId,
};

use state::EditState;

/// Document sections the engine carries but does not interpret
#[derive(Clone, Debug, Default)]
struct DocumentMeta {
    background: Option<String>,
    timeline_extra: Map<String, Value>,
    output: OutputConfig,
    merge: Vec<MergeField>,
}

#[derive(Clone, Copy, Debug, Default)]
struct PlaybackClock {
    time: TimeMs,
    playing: bool,
}

/// A loaded edit: tracks of players plus history and playback
pub struct Edit {
    state: EditState,
    history: CommandHistory,
    meta: DocumentMeta,
    clock: PlaybackClock,
}

impl Edit {
    /// Creates an empty edit with the standard player factory, no duration
    /// probe and an in-memory scene graph
    pub fn new(settings: EditSettings) -> Self {
        let mut settings = settings;
        settings.normalize();
        let history = CommandHistory::new().with_max_history(settings.max_history);

        Self {
            state: EditState::new(
                settings,
                Rc::new(StandardPlayerFactory::default()),
                Rc::new(NullProbe),
                Box::new(SceneTree::new()),
            ),
            history,
            meta: DocumentMeta::default(),
            clock: PlaybackClock::default(),
        }
    }

    pub fn with_factory(mut self, factory: Rc<dyn PlayerFactory>) -> Self {
        self.state.factory = factory;
        self
    }

    /// Uses the standard factory with a custom asset loader
    pub fn with_loader(self, loader: Rc<dyn AssetLoader>) -> Self {
        self.with_factory(Rc::new(StandardPlayerFactory::new(loader)))
    }

    pub fn with_probe(mut self, probe: Rc<dyn AssetProbe>) -> Self {
        self.state.probe = probe;
        self
    }

    pub fn with_scene(mut self, scene: Box<dyn SceneGraph>) -> Self {
        self.state.scene = scene;
        self
    }

    // =========================================================================
    // Document
    // =========================================================================

    /// Replaces the edit with `document`.
    ///
    /// Merge fields are substituted, timing is resolved (probing auto lengths
    /// one clip at a time) and every player is constructed before the current
    /// edit is torn down, so a failure leaves the current edit intact.
    pub async fn load_edit(&mut self, document: EditDocument) -> CoreResult<()> {
        let EditDocument {
            timeline,
            output,
            merge,
        } = document;

        let mut merged_tracks = Vec::with_capacity(timeline.tracks.len());
        let mut bindings: Vec<Vec<FieldBindings>> = Vec::with_capacity(timeline.tracks.len());
        for track in &timeline.tracks {
            let mut clips = Vec::with_capacity(track.clips.len());
            let mut track_bindings = Vec::with_capacity(track.clips.len());
            for clip in &track.clips {
                let (config, clip_bindings) = apply_merge_fields(clip, &merge)?;
                clips.push(config);
                track_bindings.push(clip_bindings);
            }
            merged_tracks.push(TrackConfig { clips });
            bindings.push(track_bindings);
        }

        let probe = Rc::clone(&self.state.probe);
        let resolved = resolve_timeline(&merged_tracks, probe.as_ref()).await;

        let mut players: Vec<Vec<Box<dyn Player>>> = Vec::with_capacity(merged_tracks.len());
        for (t, track) in merged_tracks.iter().enumerate() {
            let mut lane = Vec::with_capacity(track.clips.len());
            for (c, config) in track.clips.iter().enumerate() {
                let mut player = self.state.factory.create(config)?;
                player.set_bindings(std::mem::take(&mut bindings[t][c]));
                player.set_resolved_timing(resolved.tracks[t][c]);
                lane.push(player);
            }
            players.push(lane);
        }

        self.state.clear();
        self.history.clear();
        self.clock = PlaybackClock::default();
        self.meta = DocumentMeta {
            background: timeline.background,
            timeline_extra: timeline.extra,
            output,
            merge,
        };

        let mut clip_count = 0;
        for (t, lane) in players.into_iter().enumerate() {
            self.state.insert_track(t, None)?;
            for player in lane {
                let id = self.state.adopt(t, player)?;
                self.state.schedule_load(&id, false);
                clip_count += 1;
            }
        }

        self.state.refresh_timeline();
        info!(
            tracks = self.state.tracks.len(),
            clips = clip_count,
            duration = self.state.total_duration,
            "Loaded edit"
        );
        self.state.emit(EditEvent::EditLoaded {
            tracks: self.state.tracks.len(),
            clips: clip_count,
        });
        Ok(())
    }

    /// Serializes the edit with timing intents and merge placeholders intact
    pub fn to_document(&self) -> CoreResult<EditDocument> {
        let mut tracks = Vec::with_capacity(self.state.tracks.len());
        for lane in &self.state.tracks {
            let mut clips = Vec::with_capacity(lane.clips.len());
            for id in &lane.clips {
                let player = self.state.player(id)?;
                let value = restore_placeholders(player.config(), player.bindings())?;
                clips.push(serde_json::from_value::<ClipConfig>(value)?);
            }
            tracks.push(TrackConfig { clips });
        }

        Ok(EditDocument {
            timeline: TimelineConfig {
                background: self.meta.background.clone(),
                tracks,
                extra: self.meta.timeline_extra.clone(),
            },
            output: self.meta.output.clone(),
            merge: self.meta.merge.clone(),
        })
    }

    // =========================================================================
    // Commands / History
    // =========================================================================

    /// Executes a command and records it in history
    pub fn execute_command(&mut self, command: Box<dyn Command>) -> CoreResult<CommandResult> {
        let mut ctx = CommandContext::new(&mut self.state);
        self.history.execute(command, &mut ctx)
    }

    /// Undoes the last command. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> CoreResult<bool> {
        let mut ctx = CommandContext::new(&mut self.state);
        match self.history.undo(&mut ctx)? {
            Some(command_type) => {
                self.state.emit(EditEvent::Undo {
                    command_type: command_type.to_string(),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Redoes the last undone command. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> CoreResult<bool> {
        let mut ctx = CommandContext::new(&mut self.state);
        match self.history.redo(&mut ctx)? {
            Some(command_type) => {
                self.state.emit(EditEvent::Redo {
                    command_type: command_type.to_string(),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    fn last_created(result: &CommandResult) -> CoreResult<String> {
        result
            .created_ids
            .last()
            .cloned()
            .ok_or_else(|| CoreError::Internal("command reported no created id".to_string()))
    }

    /// Adds a clip at the end of a track; `track == track_count()` creates a track
    pub fn add_clip(&mut self, track: usize, config: ClipConfig) -> CoreResult<PlayerId> {
        let result = self.execute_command(Box::new(AddClipCommand::new(track, config)))?;
        Self::last_created(&result)
    }

    /// Adds a clip at a given position within a track
    pub fn insert_clip(
        &mut self,
        track: usize,
        position: usize,
        config: ClipConfig,
    ) -> CoreResult<PlayerId> {
        let command = AddClipCommand::new(track, config).at_position(position);
        let result = self.execute_command(Box::new(command))?;
        Self::last_created(&result)
    }

    pub fn delete_clip(&mut self, track: usize, clip: usize) -> CoreResult<()> {
        self.execute_command(Box::new(DeleteClipCommand::new(track, clip)))?;
        Ok(())
    }

    /// Splits a clip at `at` seconds on the timeline. Returns the right half.
    pub fn split_clip(&mut self, track: usize, clip: usize, at: TimeSec) -> CoreResult<PlayerId> {
        let result = self.execute_command(Box::new(SplitClipCommand::new(track, clip, at)))?;
        Self::last_created(&result)
    }

    pub fn move_clip(
        &mut self,
        from_track: usize,
        from_clip: usize,
        to_track: usize,
        to_clip: Option<usize>,
    ) -> CoreResult<()> {
        let mut command = MoveClipCommand::new(from_track, from_clip, to_track);
        if let Some(to_clip) = to_clip {
            command = command.to_position(to_clip);
        }
        self.execute_command(Box::new(command))?;
        Ok(())
    }

    /// Inserts an empty track (at the bottom when `index` is `None`)
    pub fn add_track(&mut self, index: Option<usize>) -> CoreResult<TrackId> {
        let command = match index {
            Some(index) => AddTrackCommand::at_index(index),
            None => AddTrackCommand::new(),
        };
        let result = self.execute_command(Box::new(command))?;
        Self::last_created(&result)
    }

    pub fn delete_track(&mut self, index: usize) -> CoreResult<()> {
        self.execute_command(Box::new(DeleteTrackCommand::new(index)))?;
        Ok(())
    }

    pub fn select_clip(&mut self, id: &str) -> CoreResult<()> {
        self.execute_command(Box::new(SelectClipCommand::new(id)))?;
        Ok(())
    }

    pub fn clear_selection(&mut self) -> CoreResult<()> {
        self.execute_command(Box::new(ClearSelectionCommand::new()))?;
        Ok(())
    }

    pub fn selected_clip(&self) -> Option<&PlayerId> {
        self.state.selection.as_ref()
    }

    /// Replaces a clip's whole configuration
    pub fn update_clip(&mut self, id: &str, config: ClipConfig) -> CoreResult<()> {
        self.execute_command(Box::new(SetUpdatedClipCommand::new(id, config)))?;
        Ok(())
    }

    pub fn update_text_content(&mut self, id: &str, text: &str) -> CoreResult<()> {
        self.execute_command(Box::new(UpdateTextContentCommand::new(id, text)))?;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn track_count(&self) -> usize {
        self.state.tracks.len()
    }

    pub fn track(&self, index: usize) -> Option<&TrackLane> {
        self.state.tracks.get(index)
    }

    pub fn clip_id(&self, track: usize, clip: usize) -> Option<&PlayerId> {
        self.state.tracks.get(track)?.clips.get(clip)
    }

    pub fn clip(&self, track: usize, clip: usize) -> Option<&dyn Player> {
        let id = self.clip_id(track, clip)?;
        self.player(id)
    }

    /// Linked player by id (players pending disposal are not returned)
    pub fn player(&self, id: &str) -> Option<&dyn Player> {
        self.state.player(id).ok()
    }

    /// Every linked player, in track order
    pub fn clips(&self) -> Vec<(&PlayerId, &dyn Player)> {
        self.state
            .tracks
            .iter()
            .flat_map(|lane| lane.clips.iter())
            .filter_map(|id| self.state.player(id).ok().map(|p| (id, p)))
            .collect()
    }

    pub fn clip_count(&self) -> usize {
        self.state.tracks.iter().map(|lane| lane.clips.len()).sum()
    }

    pub fn locate(&self, id: &str) -> Option<(usize, usize)> {
        self.state.locate(id)
    }

    /// Maximum end over every clip (milliseconds)
    pub fn total_duration(&self) -> TimeMs {
        self.state.total_duration
    }

    /// Cached timeline end used to fit end-length clips (milliseconds)
    pub fn timeline_end(&self) -> TimeMs {
        self.state.timeline_end
    }

    pub fn is_end_length(&self, id: &str) -> bool {
        self.state.end_length.contains(id)
    }

    pub fn end_length_count(&self) -> usize {
        self.state.end_length.len()
    }

    pub fn is_pending_disposal(&self, id: &str) -> bool {
        self.state.is_pending_disposal(id)
    }

    /// Players kept in the arena, including those pending disposal
    pub fn arena_len(&self) -> usize {
        self.state.players.len()
    }

    pub fn pending_load_count(&self) -> usize {
        self.state.pending_loads.len()
    }

    pub fn scene(&self) -> &dyn SceneGraph {
        self.state.scene.as_ref()
    }

    pub fn settings(&self) -> &EditSettings {
        &self.state.settings
    }

    pub fn output(&self) -> &OutputConfig {
        &self.meta.output
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Registers a handler for events named `name`
    pub fn on(&mut self, name: &str, handler: impl FnMut(&EditEvent) + 'static) -> HandlerId {
        let handler: EventHandler = Box::new(handler);
        self.state.events.on(name, handler)
    }

    pub fn off(&mut self, id: HandlerId) -> bool {
        self.state.events.off(id)
    }

    // =========================================================================
    // Playback / Update Loop
    // =========================================================================

    pub fn play(&mut self) {
        if self.clock.playing {
            return;
        }
        self.clock.playing = true;
        self.state.emit(EditEvent::PlaybackPlay {
            time: self.clock.time,
        });
    }

    pub fn pause(&mut self) {
        if !self.clock.playing {
            return;
        }
        self.clock.playing = false;
        self.state.emit(EditEvent::PlaybackPause {
            time: self.clock.time,
        });
    }

    /// Pauses and rewinds to the start
    pub fn stop(&mut self) {
        self.pause();
        self.clock.time = 0.0;
    }

    /// Moves the playhead, clamped to `[0, total_duration]`
    pub fn seek(&mut self, time_ms: TimeMs) {
        let time = if time_ms.is_finite() { time_ms } else { 0.0 };
        self.clock.time = time.clamp(0.0, self.state.total_duration.max(0.0));
    }

    pub fn playback_time(&self) -> TimeMs {
        self.clock.time
    }

    pub fn is_playing(&self) -> bool {
        self.clock.playing
    }

    /// Runs one frame: advances the clock, updates players, applies finished
    /// loads and flushes the disposal queue
    pub fn update(&mut self, delta_ms: TimeMs) {
        let delta = if delta_ms.is_finite() { delta_ms.max(0.0) } else { 0.0 };

        if self.clock.playing {
            self.clock.time += delta;
            let end = self.state.total_duration;
            if self.clock.time >= end {
                self.clock.time = end;
                if self.state.settings.pause_at_end {
                    self.pause();
                }
            }
        }

        let elapsed = self.clock.time;
        for slot in self.state.players.values_mut() {
            if !slot.pending_disposal {
                slot.player.update(delta, elapsed);
            }
        }

        self.state.drain_loads();
        self.state.flush_disposals();
    }

    /// Waits for every pending load and applies it.
    ///
    /// Never resolves while a load is stalled.
    pub async fn settle_loads(&mut self) {
        while let Some(completion) = self.state.pending_loads.next().await {
            self.state.apply_load(completion);
        }
    }

    /// Disposes every player and drops history and handlers
    pub fn dispose(&mut self) {
        debug!(players = self.state.players.len(), "Disposing edit");
        self.state.clear();
        self.state.total_duration = 0.0;
        self.history.clear();
        self.state.events.clear();
        self.clock = PlaybackClock::default();
    }
}

impl Drop for Edit {
    fn drop(&mut self) {
        self.state.clear();
    }
}
