//! Edit Event Bus
//!
//! Synchronous notifications from the engine to renderers and UI.
//! Handlers receive only the event, so they cannot re-enter the engine.

use serde::Serialize;
use tracing::trace;

use crate::core::{HandlerId, PlayerId, TimeMs, TrackId};

// =============================================================================
// Event Names
// =============================================================================

/// Event names used for host communication
pub mod event_names {
    /// Aggregate duration changed
    pub const DURATION_CHANGED: &str = "duration:changed";
    /// Propagation finished
    pub const TIMELINE_UPDATED: &str = "timeline:updated";
    /// A command was undone
    pub const EDIT_UNDO: &str = "edit:undo";
    /// A command was redone
    pub const EDIT_REDO: &str = "edit:redo";
    /// Clip added
    pub const CLIP_ADDED: &str = "clip:added";
    /// Clip deleted
    pub const CLIP_DELETED: &str = "clip:deleted";
    /// Clip split in two
    pub const CLIP_SPLIT: &str = "clip:split";
    /// Clip moved to another position or track
    pub const CLIP_MOVED: &str = "clip:moved";
    /// Clip configuration replaced
    pub const CLIP_UPDATED: &str = "clip:updated";
    /// Clip selected
    pub const CLIP_SELECTED: &str = "clip:selected";
    /// Selection cleared
    pub const SELECTION_CLEARED: &str = "selection:cleared";
    /// Track added
    pub const TRACK_ADDED: &str = "track:added";
    /// Track deleted
    pub const TRACK_DELETED: &str = "track:deleted";
    /// Deferred asset load failed
    pub const CLIP_LOAD_FAILED: &str = "clip:load-failed";
    /// Playback started
    pub const PLAYBACK_PLAY: &str = "playback:play";
    /// Playback paused
    pub const PLAYBACK_PAUSE: &str = "playback:pause";
    /// Edit document loaded
    pub const EDIT_LOADED: &str = "edit:loaded";
}

// =============================================================================
// Event Payloads
// =============================================================================

/// Engine event, serialized with its name in `type`
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum EditEvent {
    #[serde(rename = "duration:changed", rename_all = "camelCase")]
    DurationChanged { duration: TimeMs },

    #[serde(rename = "timeline:updated", rename_all = "camelCase")]
    TimelineUpdated {
        timeline_end: TimeMs,
        total_duration: TimeMs,
    },

    #[serde(rename = "edit:undo", rename_all = "camelCase")]
    Undo { command_type: String },

    #[serde(rename = "edit:redo", rename_all = "camelCase")]
    Redo { command_type: String },

    #[serde(rename = "clip:added", rename_all = "camelCase")]
    ClipAdded {
        player_id: PlayerId,
        track_index: usize,
        clip_index: usize,
    },

    #[serde(rename = "clip:deleted", rename_all = "camelCase")]
    ClipDeleted { player_id: PlayerId },

    #[serde(rename = "clip:split", rename_all = "camelCase")]
    ClipSplit { left_id: PlayerId, right_id: PlayerId },

    #[serde(rename = "clip:moved", rename_all = "camelCase")]
    ClipMoved {
        player_id: PlayerId,
        track_index: usize,
        clip_index: usize,
    },

    #[serde(rename = "clip:updated", rename_all = "camelCase")]
    ClipUpdated { player_id: PlayerId },

    #[serde(rename = "clip:selected", rename_all = "camelCase")]
    ClipSelected { player_id: PlayerId },

    #[serde(rename = "selection:cleared")]
    SelectionCleared,

    #[serde(rename = "track:added", rename_all = "camelCase")]
    TrackAdded { track_id: TrackId, index: usize },

    #[serde(rename = "track:deleted", rename_all = "camelCase")]
    TrackDeleted { track_id: TrackId },

    #[serde(rename = "clip:load-failed", rename_all = "camelCase")]
    ClipLoadFailed { player_id: PlayerId, error: String },

    #[serde(rename = "playback:play", rename_all = "camelCase")]
    PlaybackPlay { time: TimeMs },

    #[serde(rename = "playback:pause", rename_all = "camelCase")]
    PlaybackPause { time: TimeMs },

    #[serde(rename = "edit:loaded", rename_all = "camelCase")]
    EditLoaded { tracks: usize, clips: usize },
}

impl EditEvent {
    /// Returns the event name handlers subscribe to
    pub fn name(&self) -> &'static str {
        use event_names::*;
        match self {
            Self::DurationChanged { .. } => DURATION_CHANGED,
            Self::TimelineUpdated { .. } => TIMELINE_UPDATED,
            Self::Undo { .. } => EDIT_UNDO,
            Self::Redo { .. } => EDIT_REDO,
            Self::ClipAdded { .. } => CLIP_ADDED,
            Self::ClipDeleted { .. } => CLIP_DELETED,
            Self::ClipSplit { .. } => CLIP_SPLIT,
            Self::ClipMoved { .. } => CLIP_MOVED,
            Self::ClipUpdated { .. } => CLIP_UPDATED,
            Self::ClipSelected { .. } => CLIP_SELECTED,
            Self::SelectionCleared => SELECTION_CLEARED,
            Self::TrackAdded { .. } => TRACK_ADDED,
            Self::TrackDeleted { .. } => TRACK_DELETED,
            Self::ClipLoadFailed { .. } => CLIP_LOAD_FAILED,
            Self::PlaybackPlay { .. } => PLAYBACK_PLAY,
            Self::PlaybackPause { .. } => PLAYBACK_PAUSE,
            Self::EditLoaded { .. } => EDIT_LOADED,
        }
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Event handler callback
pub type EventHandler = Box<dyn FnMut(&EditEvent)>;

struct Subscription {
    id: HandlerId,
    name: String,
    handler: EventHandler,
}

/// Named, synchronous publish/subscribe
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: HandlerId,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events named `name`
    pub fn on(&mut self, name: &str, handler: EventHandler) -> HandlerId {
        self.next_id += 1;
        let id = self.next_id;
        self.subscriptions.push(Subscription {
            id,
            name: name.to_string(),
            handler,
        });
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Delivers `event` to every handler registered for its name, in
    /// registration order
    pub fn emit(&mut self, event: EditEvent) {
        let name = event.name();
        trace!(event = name, "Emitting edit event");
        for subscription in self.subscriptions.iter_mut().filter(|s| s.name == name) {
            (subscription.handler)(&event);
        }
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.subscriptions.len())
            .finish()
    }
}
