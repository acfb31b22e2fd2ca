//! Command Trait Definition
//!
//! Defines the trait that all edit commands must implement.

use serde::{Deserialize, Serialize};

use crate::core::{commands::CommandContext, new_id, CoreResult, OpId, PlayerId, TrackId};

/// Command execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Generated Operation ID
    pub op_id: OpId,

    /// List of state changes
    pub changes: Vec<StateChange>,

    /// Newly created IDs (players, tracks)
    pub created_ids: Vec<String>,

    /// Deleted IDs
    pub deleted_ids: Vec<String>,
}

impl CommandResult {
    /// Creates an empty result with a fresh operation ID
    pub fn new() -> Self {
        Self::with_op_id(&new_id())
    }

    /// Creates an empty result with the given operation ID
    pub fn with_op_id(op_id: &str) -> Self {
        Self {
            op_id: op_id.to_string(),
            changes: vec![],
            created_ids: vec![],
            deleted_ids: vec![],
        }
    }

    /// Adds a state change
    pub fn with_change(mut self, change: StateChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Adds a created ID
    pub fn with_created_id(mut self, id: &str) -> Self {
        self.created_ids.push(id.to_string());
        self
    }

    /// Adds a deleted ID
    pub fn with_deleted_id(mut self, id: &str) -> Self {
        self.deleted_ids.push(id.to_string());
        self
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self::new()
    }
}

/// State change types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateChange {
    #[serde(rename_all = "camelCase")]
    ClipCreated { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    ClipModified { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    ClipDeleted { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    ClipMoved { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    TrackCreated { track_id: TrackId },
    #[serde(rename_all = "camelCase")]
    TrackDeleted { track_id: TrackId },
    #[serde(rename_all = "camelCase")]
    SelectionChanged { player_id: Option<PlayerId> },
}

/// Trait that all edit commands must implement
///
/// # Core Principles
/// - Commands touch shared state only through the [`CommandContext`].
/// - `execute` validates before it mutates; a failed command leaves no trace.
/// - Undo state (configuration copies, ids, indices) is captured during
///   `execute` so `undo` and `redo` reproduce the same structure.
///
/// # Example
/// ```rust,ignore
/// pub struct RenameTrackCommand { ... }
///
/// impl Command for RenameTrackCommand {
///     fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
///         // mutate through ctx, then ctx.propagate(..)
///     }
///
///     fn undo(&self, ctx: &mut CommandContext<'_>) -> CoreResult<()> {
///         // inverse mutation
///     }
///
///     fn type_name(&self) -> &'static str {
///         "RenameTrack"
///     }
///
///     fn to_json(&self) -> serde_json::Value {
///         serde_json::json!({ ... })
///     }
/// }
/// ```
pub trait Command {
    /// Execute the command
    ///
    /// Uses &mut self to store undo state during execution.
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult>;

    /// Undo the command
    ///
    /// Only called after execute succeeds. Irreversible commands keep the
    /// default no-op.
    fn undo(&self, _ctx: &mut CommandContext<'_>) -> CoreResult<()> {
        Ok(())
    }

    /// Redo the command
    ///
    /// Default implementation is identical to execute.
    fn redo(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
        self.execute(ctx)
    }

    /// Command type name, used for logging and history inspection
    fn type_name(&self) -> &'static str;

    /// JSON representation of the command's parameters
    fn to_json(&self) -> serde_json::Value;
}
