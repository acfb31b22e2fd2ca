//! Selection Commands

use serde::{Deserialize, Serialize};

use crate::core::{
    commands::{Command, CommandContext, CommandResult, StateChange},
    events::EditEvent,
    CoreResult, PlayerId,
};

fn announce(ctx: &mut CommandContext<'_>, selection: Option<PlayerId>) {
    match selection {
        Some(player_id) => ctx.emit(EditEvent::ClipSelected { player_id }),
        None => ctx.emit(EditEvent::SelectionCleared),
    }
}

/// Command to select a clip
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectClipCommand {
    pub player_id: PlayerId,
    #[serde(skip)]
    previous: Option<PlayerId>,
}

impl SelectClipCommand {
    pub fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            previous: None,
        }
    }
}

impl Command for SelectClipCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        ctx.player(&self.player_id)?;
        self.previous = ctx.selection().cloned();

        ctx.set_selection(Some(self.player_id.clone()));
        announce(ctx, Some(self.player_id.clone()));

        Ok(CommandResult::new().with_change(StateChange::SelectionChanged {
            player_id: Some(self.player_id.clone()),
        }))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        // The previous clip may have been deleted since
        let previous = self
            .previous
            .clone()
            .filter(|id| ctx.player(id).is_ok());
        ctx.set_selection(previous.clone());
        announce(ctx, previous);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SelectClip"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "playerId": self.player_id })
    }
}

/// Command to clear the selection
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClearSelectionCommand {
    #[serde(skip)]
    previous: Option<PlayerId>,
}

impl ClearSelectionCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for ClearSelectionCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        self.previous = ctx.selection().cloned();
        ctx.set_selection(None);
        announce(ctx, None);

        Ok(CommandResult::new().with_change(StateChange::SelectionChanged { player_id: None }))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        let previous = self
            .previous
            .clone()
            .filter(|id| ctx.player(id).is_ok());
        ctx.set_selection(previous.clone());
        announce(ctx, previous);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "ClearSelection"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({})
    }
}
