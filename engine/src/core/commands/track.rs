//! Track Commands Module
//!
//! Implements track-level editing commands.

use serde::{Deserialize, Serialize};

use crate::core::{
    commands::{Command, CommandContext, CommandResult, StateChange},
    events::EditEvent,
    players::ClipSnapshot,
    timing::ResolvedTiming,
    CoreResult, PlayerId, TrackId,
};

// =============================================================================
// AddTrackCommand
// =============================================================================

/// Command to insert an empty track
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackCommand {
    /// Insert position (defaults to the bottom of the stack)
    pub index: Option<usize>,
    #[serde(skip)]
    inserted: Option<(usize, TrackId)>,
}

impl AddTrackCommand {
    pub fn new() -> Self {
        Self {
            index: None,
            inserted: None,
        }
    }

    pub fn at_index(index: usize) -> Self {
        Self {
            index: Some(index),
            inserted: None,
        }
    }

    /// Returns the created track ID (after execution)
    pub fn track_id(&self) -> Option<&TrackId> {
        self.inserted.as_ref().map(|(_, id)| id)
    }
}

impl Default for AddTrackCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for AddTrackCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let index = self.index.unwrap_or_else(|| ctx.track_count());
        let reuse_id = self.inserted.as_ref().map(|(_, id)| id.clone());
        let track_id = ctx.insert_track(index, reuse_id)?;

        ctx.emit(EditEvent::TrackAdded {
            track_id: track_id.clone(),
            index,
        });
        self.inserted = Some((index, track_id.clone()));

        Ok(CommandResult::new()
            .with_change(StateChange::TrackCreated {
                track_id: track_id.clone(),
            })
            .with_created_id(&track_id))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let Some((index, track_id)) = &self.inserted else {
            return Ok(());
        };
        ctx.remove_track(*index)?;
        ctx.emit(EditEvent::TrackDeleted {
            track_id: track_id.clone(),
        });
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "AddTrack"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "index": self.index })
    }
}

// =============================================================================
// DeleteTrackCommand
// =============================================================================

#[derive(Clone, Debug)]
struct DeletedTrack {
    track_id: TrackId,
    clips: Vec<(PlayerId, ClipSnapshot, ResolvedTiming)>,
    selected: Option<PlayerId>,
}

/// Command to delete a track together with its clips
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTrackCommand {
    pub index: usize,
    #[serde(skip)]
    deleted: Option<DeletedTrack>,
}

impl DeleteTrackCommand {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            deleted: None,
        }
    }
}

impl Command for DeleteTrackCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let track_id = ctx.track_id(self.index)?;
        let ids = ctx.track_clips(self.index)?.to_vec();

        let clips = ids
            .iter()
            .map(|id| Ok((id.clone(), ctx.snapshot(id)?, ctx.resolved_timing(id)?)))
            .collect::<CoreResult<Vec<_>>>()?;
        let selected = ctx.selection().filter(|s| ids.contains(s)).cloned();

        let mut result = CommandResult::new();
        for id in &ids {
            ctx.queue_disposal(id)?;
            result = result
                .with_change(StateChange::ClipDeleted {
                    player_id: id.clone(),
                })
                .with_deleted_id(id);
        }
        ctx.remove_track(self.index)?;
        ctx.propagate(&[]);

        for id in &ids {
            ctx.emit(EditEvent::ClipDeleted {
                player_id: id.clone(),
            });
        }
        ctx.emit(EditEvent::TrackDeleted {
            track_id: track_id.clone(),
        });

        self.deleted = Some(DeletedTrack {
            track_id: track_id.clone(),
            clips,
            selected,
        });

        Ok(result
            .with_change(StateChange::TrackDeleted {
                track_id: track_id.clone(),
            })
            .with_deleted_id(&track_id))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let Some(deleted) = &self.deleted else {
            return Ok(());
        };

        ctx.insert_track(self.index, Some(deleted.track_id.clone()))?;
        for (position, (id, snapshot, timing)) in deleted.clips.iter().enumerate() {
            ctx.spawn_player(self.index, position, Some(id.clone()), snapshot.clone())?;
            ctx.restore(id, snapshot.clone(), *timing)?;
        }
        ctx.propagate(&[(self.index, 0)]);

        ctx.emit(EditEvent::TrackAdded {
            track_id: deleted.track_id.clone(),
            index: self.index,
        });
        if let Some(selected) = &deleted.selected {
            ctx.set_selection(Some(selected.clone()));
            ctx.emit(EditEvent::ClipSelected {
                player_id: selected.clone(),
            });
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "DeleteTrack"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "index": self.index })
    }
}
