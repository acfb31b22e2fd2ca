//! Text Commands Module

use serde::{Deserialize, Serialize};

use crate::core::{
    commands::{Command, CommandContext, CommandResult, StateChange},
    events::EditEvent,
    CoreError, CoreResult, PlayerId,
};

/// Command replacing the text of a text or rich-text clip
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextContentCommand {
    pub player_id: PlayerId,
    pub text: String,
    #[serde(skip)]
    previous_text: Option<String>,
}

impl UpdateTextContentCommand {
    pub fn new(player_id: &str, text: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            text: text.to_string(),
            previous_text: None,
        }
    }

    fn apply(&self, ctx: &mut CommandContext<'_>, text: &str) -> CoreResult<String> {
        let mut snapshot = ctx.snapshot(&self.player_id)?;
        let previous = snapshot
            .config
            .asset
            .text_content()
            .map(str::to_string)
            .ok_or_else(|| {
                CoreError::UnsupportedAsset(format!(
                    "{} clips have no text content",
                    snapshot.config.asset.type_name()
                ))
            })?;

        snapshot.config.asset.set_text_content(text);
        ctx.reconfigure(&self.player_id, snapshot)?;
        // Redraw with the new text
        ctx.schedule_load(&self.player_id, false);
        if let Some(position) = ctx.locate(&self.player_id) {
            ctx.propagate(&[position]);
        }
        ctx.emit(EditEvent::ClipUpdated {
            player_id: self.player_id.clone(),
        });
        Ok(previous)
    }
}

impl Command for UpdateTextContentCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        let previous = self.apply(ctx, &self.text)?;
        self.previous_text = Some(previous);

        Ok(CommandResult::new().with_change(StateChange::ClipModified {
            player_id: self.player_id.clone(),
        }))
    }

    fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        if let Some(previous) = &self.previous_text {
            self.apply(ctx, previous)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "UpdateTextContent"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "playerId": self.player_id,
            "text": self.text,
        })
    }
}
