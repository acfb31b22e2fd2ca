//! Clip Commands Module
//!
//! Implements the clip-level editing commands.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{
    commands::{Command, CommandContext, CommandResult, StateChange},
    events::EditEvent,
    ms_to_sec,
    players::{ClipSnapshot, FieldBindings},
    timeline::ClipConfig,
    timing::{LengthIntent, ResolvedTiming, StartIntent},
    CoreError, CoreResult, PlayerId, TimeSec, TrackId,
};

/// Slack allowed on split-point bounds for float noise
const SPLIT_EPSILON: TimeSec = 1e-9;

// =============================================================================
// AddClipCommand
// =============================================================================

/// Command to add a new clip to a track
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddClipCommand {
    /// Target track index. Equal to the track count creates a new track.
    pub track_index: usize,
    /// Clip configuration
    pub config: ClipConfig,
    /// Position within the track (defaults to the end)
    pub position: Option<usize>,
    /// Created player ID (stored after execution for undo/redo)
    #[serde(skip)]
    created_player_id: Option<PlayerId>,
    /// Track created by this command, if any
    #[serde(skip)]
    created_track: Option<TrackId>,
    /// The clip was selected when last undone
    #[serde(skip)]
    reselect: Cell<bool>,
}

impl AddClipCommand {
    /// Creates a command appending `config` to a track
    pub fn new(track_index: usize, config: ClipConfig) -> Self {
        Self {
            track_index,
            config,
            position: None,
            created_player_id: None,
            created_track: None,
            reselect: Cell::new(false),
        }
    }

    /// Inserts at `position` instead of appending
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns the created player ID (after execution)
    pub fn created_player_id(&self) -> Option<&PlayerId> {
        self.created_player_id.as_ref()
    }
}

impl Command for AddClipCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let track_count = ctx.track_count();
        if self.track_index > track_count {
            return Err(CoreError::TrackNotFound(self.track_index));
        }

        let creates_track = self.track_index == track_count;
        let lane_len = if creates_track {
            0
        } else {
            ctx.track_clips(self.track_index)?.len()
        };
        let index = self.position.unwrap_or(lane_len);
        if index > lane_len {
            return Err(CoreError::ClipNotFound {
                track: self.track_index,
                clip: index,
            });
        }

        let mut result = CommandResult::new();
        if creates_track {
            let track_id = ctx.insert_track(self.track_index, self.created_track.clone())?;
            result = result
                .with_change(StateChange::TrackCreated {
                    track_id: track_id.clone(),
                })
                .with_created_id(&track_id);
            self.created_track = Some(track_id);
        } else {
            self.created_track = None;
        }

        let snapshot = ClipSnapshot {
            config: self.config.clone(),
            bindings: FieldBindings::new(),
        };
        let player_id = match ctx.spawn_player(
            self.track_index,
            index,
            self.created_player_id.clone(),
            snapshot,
        ) {
            Ok(id) => id,
            Err(e) => {
                if creates_track {
                    ctx.remove_track(self.track_index)?;
                }
                return Err(e);
            }
        };
        self.created_player_id = Some(player_id.clone());

        ctx.propagate(&[(self.track_index, index)]);
        ctx.emit(EditEvent::ClipAdded {
            player_id: player_id.clone(),
            track_index: self.track_index,
            clip_index: index,
        });
        if self.reselect.replace(false) {
            ctx.set_selection(Some(player_id.clone()));
            ctx.emit(EditEvent::ClipSelected {
                player_id: player_id.clone(),
            });
        }

        Ok(result
            .with_change(StateChange::ClipCreated {
                player_id: player_id.clone(),
            })
            .with_created_id(&player_id))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let Some(player_id) = &self.created_player_id else {
            return Ok(());
        };

        self.reselect.set(ctx.selection() == Some(player_id));
        let position = ctx.queue_disposal(player_id)?;
        let removed_track = match &self.created_track {
            Some(track_id) if ctx.track_id(self.track_index)? == *track_id => {
                ctx.remove_track(self.track_index)?;
                true
            }
            _ => false,
        };

        if removed_track {
            ctx.propagate(&[]);
        } else {
            ctx.propagate(&[position]);
        }
        ctx.emit(EditEvent::ClipDeleted {
            player_id: player_id.clone(),
        });
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "AddClip"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// =============================================================================
// DeleteClipCommand
// =============================================================================

#[derive(Clone, Debug)]
struct DeletedClip {
    player_id: PlayerId,
    snapshot: ClipSnapshot,
    timing: ResolvedTiming,
    was_selected: bool,
}

/// Command to delete a clip
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteClipCommand {
    pub track_index: usize,
    pub clip_index: usize,
    #[serde(skip)]
    deleted: Option<DeletedClip>,
}

impl DeleteClipCommand {
    pub fn new(track_index: usize, clip_index: usize) -> Self {
        Self {
            track_index,
            clip_index,
            deleted: None,
        }
    }
}

impl Command for DeleteClipCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let player_id = ctx.clip_id_at(self.track_index, self.clip_index)?;
        let snapshot = ctx.snapshot(&player_id)?;
        let timing = ctx.resolved_timing(&player_id)?;
        let was_selected = ctx.selection() == Some(&player_id);

        let position = ctx.queue_disposal(&player_id)?;
        ctx.propagate(&[position]);

        ctx.emit(EditEvent::ClipDeleted {
            player_id: player_id.clone(),
        });

        self.deleted = Some(DeletedClip {
            player_id: player_id.clone(),
            snapshot,
            timing,
            was_selected,
        });

        Ok(CommandResult::new()
            .with_change(StateChange::ClipDeleted {
                player_id: player_id.clone(),
            })
            .with_deleted_id(&player_id))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let Some(deleted) = &self.deleted else {
            return Ok(());
        };

        let player_id = ctx.spawn_player(
            self.track_index,
            self.clip_index,
            Some(deleted.player_id.clone()),
            deleted.snapshot.clone(),
        )?;
        // A rebuilt player has not measured its auto length yet
        ctx.restore(&player_id, deleted.snapshot.clone(), deleted.timing)?;
        ctx.propagate(&[(self.track_index, self.clip_index)]);

        ctx.emit(EditEvent::ClipAdded {
            player_id: player_id.clone(),
            track_index: self.track_index,
            clip_index: self.clip_index,
        });
        if deleted.was_selected {
            ctx.set_selection(Some(player_id.clone()));
            ctx.emit(EditEvent::ClipSelected { player_id });
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "DeleteClip"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "trackIndex": self.track_index,
            "clipIndex": self.clip_index,
        })
    }
}

// =============================================================================
// SplitClipCommand
// =============================================================================

#[derive(Clone, Debug)]
struct SplitState {
    left_id: PlayerId,
    right_id: PlayerId,
    original: ClipSnapshot,
    original_timing: ResolvedTiming,
}

/// Command to split a clip into two at an absolute timeline position
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitClipCommand {
    pub track_index: usize,
    pub clip_index: usize,
    /// Split position on the timeline, in seconds
    pub split_at: TimeSec,
    #[serde(skip)]
    split: Option<SplitState>,
    /// The right half was selected when last undone
    #[serde(skip)]
    reselect: Cell<bool>,
}

impl SplitClipCommand {
    pub fn new(track_index: usize, clip_index: usize, split_at: TimeSec) -> Self {
        Self {
            track_index,
            clip_index,
            split_at,
            split: None,
            reselect: Cell::new(false),
        }
    }

    /// IDs of the left and right halves (after execution)
    pub fn halves(&self) -> Option<(&PlayerId, &PlayerId)> {
        self.split.as_ref().map(|s| (&s.left_id, &s.right_id))
    }
}

impl Command for SplitClipCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let left_id = ctx.clip_id_at(self.track_index, self.clip_index)?;
        let original = ctx.snapshot(&left_id)?;
        let original_timing = ctx.resolved_timing(&left_id)?;

        let start = ms_to_sec(original_timing.start);
        let length = ms_to_sec(original_timing.length);
        let offset = self.split_at - start;
        let min_distance = ctx.settings().min_split_distance_sec;
        if !offset.is_finite()
            || offset < min_distance - SPLIT_EPSILON
            || offset > length - min_distance + SPLIT_EPSILON
        {
            return Err(CoreError::InvalidSplitPoint(self.split_at));
        }

        let mut left = original.config.clone();
        left.length = LengthIntent::Seconds(offset);

        let mut right = original.config.clone();
        right.start = StartIntent::Seconds(start + offset);
        right.length = LengthIntent::Seconds(length - offset);
        if let Some(trim) = right.asset.trim() {
            right.asset.set_trim(trim + offset);
        }

        ctx.reconfigure(
            &left_id,
            ClipSnapshot {
                config: left,
                bindings: original.bindings.clone(),
            },
        )?;

        let right_snapshot = ClipSnapshot {
            config: right,
            bindings: original.bindings.clone(),
        };
        let reuse_id = self.split.as_ref().map(|s| s.right_id.clone());
        let right_id = match ctx.spawn_player(
            self.track_index,
            self.clip_index + 1,
            reuse_id,
            right_snapshot,
        ) {
            Ok(id) => id,
            Err(e) => {
                ctx.restore(&left_id, original, original_timing)?;
                return Err(e);
            }
        };

        ctx.propagate(&[(self.track_index, self.clip_index)]);
        ctx.emit(EditEvent::ClipSplit {
            left_id: left_id.clone(),
            right_id: right_id.clone(),
        });
        debug!(left = %left_id, right = %right_id, offset, "Split clip");
        if self.reselect.replace(false) {
            ctx.set_selection(Some(right_id.clone()));
            ctx.emit(EditEvent::ClipSelected {
                player_id: right_id.clone(),
            });
        }

        self.split = Some(SplitState {
            left_id: left_id.clone(),
            right_id: right_id.clone(),
            original,
            original_timing,
        });

        Ok(CommandResult::new()
            .with_change(StateChange::ClipModified { player_id: left_id })
            .with_change(StateChange::ClipCreated {
                player_id: right_id.clone(),
            })
            .with_created_id(&right_id))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let Some(split) = &self.split else {
            return Ok(());
        };

        ctx.restore(
            &split.left_id,
            split.original.clone(),
            split.original_timing,
        )?;
        self.reselect.set(ctx.selection() == Some(&split.right_id));
        ctx.queue_disposal(&split.right_id)?;

        let position = ctx
            .locate(&split.left_id)
            .unwrap_or((self.track_index, self.clip_index));
        ctx.propagate(&[position]);

        ctx.emit(EditEvent::ClipDeleted {
            player_id: split.right_id.clone(),
        });
        ctx.emit(EditEvent::ClipUpdated {
            player_id: split.left_id.clone(),
        });
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SplitClip"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "trackIndex": self.track_index,
            "clipIndex": self.clip_index,
            "splitAt": self.split_at,
        })
    }
}

// =============================================================================
// MoveClipCommand
// =============================================================================

#[derive(Clone, Debug)]
struct MoveState {
    player_id: PlayerId,
    to_index: usize,
    previous: ClipSnapshot,
}

/// Command to move a clip within or between tracks
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveClipCommand {
    pub from_track: usize,
    pub from_clip: usize,
    pub to_track: usize,
    /// Target position (defaults to the end of the target track)
    pub to_clip: Option<usize>,
    /// New start intent applied with the move
    pub new_start: Option<StartIntent>,
    #[serde(skip)]
    moved: Option<MoveState>,
}

impl MoveClipCommand {
    pub fn new(from_track: usize, from_clip: usize, to_track: usize) -> Self {
        Self {
            from_track,
            from_clip,
            to_track,
            to_clip: None,
            new_start: None,
            moved: None,
        }
    }

    pub fn to_position(mut self, to_clip: usize) -> Self {
        self.to_clip = Some(to_clip);
        self
    }

    pub fn with_start(mut self, start: StartIntent) -> Self {
        self.new_start = Some(start);
        self
    }

    fn touched(&self, to_index: usize) -> Vec<(usize, usize)> {
        if self.from_track == self.to_track {
            vec![(self.from_track, self.from_clip.min(to_index))]
        } else {
            vec![(self.from_track, self.from_clip), (self.to_track, to_index)]
        }
    }
}

impl Command for MoveClipCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let player_id = ctx.clip_id_at(self.from_track, self.from_clip)?;
        let previous = ctx.snapshot(&player_id)?;

        let target_len = ctx.track_clips(self.to_track)?.len();
        let default_index = if self.to_track == self.from_track {
            target_len - 1
        } else {
            target_len
        };
        let to_index = self.to_clip.unwrap_or(default_index);

        ctx.move_player(&player_id, self.to_track, to_index)?;
        if let Some(start) = self.new_start {
            let mut config = previous.config.clone();
            config.start = start;
            ctx.reconfigure(
                &player_id,
                ClipSnapshot {
                    config,
                    bindings: previous.bindings.clone(),
                },
            )?;
        }

        ctx.propagate(&self.touched(to_index));
        ctx.emit(EditEvent::ClipMoved {
            player_id: player_id.clone(),
            track_index: self.to_track,
            clip_index: to_index,
        });

        self.moved = Some(MoveState {
            player_id: player_id.clone(),
            to_index,
            previous,
        });

        Ok(CommandResult::new().with_change(StateChange::ClipMoved { player_id }))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let Some(moved) = &self.moved else {
            return Ok(());
        };

        ctx.move_player(&moved.player_id, self.from_track, self.from_clip)?;
        if self.new_start.is_some() {
            ctx.reconfigure(&moved.player_id, moved.previous.clone())?;
        }

        ctx.propagate(&self.touched(moved.to_index));
        ctx.emit(EditEvent::ClipMoved {
            player_id: moved.player_id.clone(),
            track_index: self.from_track,
            clip_index: self.from_clip,
        });
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "MoveClip"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// =============================================================================
// SetUpdatedClipCommand
// =============================================================================

#[derive(Clone, Debug)]
struct ClipUpdate {
    initial: ClipSnapshot,
    initial_timing: ResolvedTiming,
    asset_changed: bool,
}

/// Command applying a whole new clip configuration from an external editor
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUpdatedClipCommand {
    pub player_id: PlayerId,
    pub updated: ClipConfig,
    #[serde(skip)]
    initial: Option<ClipUpdate>,
}

impl SetUpdatedClipCommand {
    pub fn new(player_id: &str, updated: ClipConfig) -> Self {
        Self {
            player_id: player_id.to_string(),
            updated,
            initial: None,
        }
    }
}

impl Command for SetUpdatedClipCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let initial = ctx.snapshot(&self.player_id)?;
        let initial_timing = ctx.resolved_timing(&self.player_id)?;
        let asset_changed = initial.config.asset != self.updated.asset;
        let newly_auto = self.updated.length.is_auto() && !initial.config.length.is_auto();

        ctx.reconfigure(
            &self.player_id,
            ClipSnapshot {
                config: self.updated.clone(),
                bindings: initial.bindings.clone(),
            },
        )?;
        if asset_changed || newly_auto {
            ctx.schedule_load(&self.player_id, self.updated.length.is_auto());
        }

        if let Some(position) = ctx.locate(&self.player_id) {
            ctx.propagate(&[position]);
        }
        ctx.emit(EditEvent::ClipUpdated {
            player_id: self.player_id.clone(),
        });

        self.initial = Some(ClipUpdate {
            initial,
            initial_timing,
            asset_changed,
        });

        Ok(CommandResult::new().with_change(StateChange::ClipModified {
            player_id: self.player_id.clone(),
        }))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let Some(update) = &self.initial else {
            return Ok(());
        };

        ctx.restore(
            &self.player_id,
            update.initial.clone(),
            update.initial_timing,
        )?;
        if update.asset_changed {
            ctx.schedule_load(&self.player_id, false);
        }

        if let Some(position) = ctx.locate(&self.player_id) {
            ctx.propagate(&[position]);
        }
        ctx.emit(EditEvent::ClipUpdated {
            player_id: self.player_id.clone(),
        });
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SetUpdatedClip"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
