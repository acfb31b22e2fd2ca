//! Command History Module
//!
//! Executes commands through a context and keeps the linear undo/redo
//! history. The history is an owned value: callers only get `execute`,
//! `undo` and `redo`, never the entry list.

use tracing::{debug, info};

use crate::core::{
    commands::{Command, CommandContext, CommandResult},
    CoreResult, OpId,
};

/// Default maximum number of history entries
pub const DEFAULT_MAX_HISTORY: usize = 100;

// =============================================================================
// History Entry
// =============================================================================

/// Entry in the undo/redo history
pub struct HistoryEntry {
    /// Operation ID
    pub op_id: OpId,
    /// Command that was executed
    command: Box<dyn Command>,
    /// Result from the latest execute/redo
    pub result: CommandResult,
    /// Timestamp of the latest execute/redo
    pub timestamp: String,
}

impl std::fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("op_id", &self.op_id)
            .field("command", &self.command.type_name())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl HistoryEntry {
    fn new(command: Box<dyn Command>, result: CommandResult) -> Self {
        Self {
            op_id: result.op_id.clone(),
            command,
            result,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// =============================================================================
// Command History
// =============================================================================

/// Linear undo/redo history with a cursor.
///
/// `applied` counts the entries currently in effect, so the classic
/// "current index" is `applied - 1` and ranges over `-1..=len-1`.
#[derive(Debug)]
pub struct CommandHistory {
    entries: Vec<HistoryEntry>,
    applied: usize,
    max_history_size: usize,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
            max_history_size: DEFAULT_MAX_HISTORY,
        }
    }

    /// Sets the maximum history size (at least 1)
    pub fn with_max_history(mut self, size: usize) -> Self {
        self.max_history_size = size.max(1);
        self
    }

    pub fn set_max_history(&mut self, size: usize) {
        self.max_history_size = size.max(1);
        self.trim();
    }

    /// Executes a command and records it, discarding any redo tail.
    ///
    /// A failed command is not recorded.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        ctx: &mut CommandContext<'_>,
    ) -> CoreResult<CommandResult> {
        let result = command.execute(ctx)?;
        info!(
            command = command.type_name(),
            op_id = %result.op_id,
            "Executed command"
        );

        self.entries.truncate(self.applied);
        self.entries.push(HistoryEntry::new(command, result.clone()));
        self.applied = self.entries.len();
        self.trim();

        Ok(result)
    }

    fn trim(&mut self) {
        if self.entries.len() > self.max_history_size {
            let excess = self.entries.len() - self.max_history_size;
            self.entries.drain(..excess);
            self.applied = self.applied.saturating_sub(excess);
            debug!(dropped = excess, "Trimmed command history");
        }
    }

    /// Undoes the most recent applied command.
    ///
    /// Returns the command type, or `None` when there is nothing to undo.
    pub fn undo(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<Option<&'static str>> {
        if self.applied == 0 {
            return Ok(None);
        }

        let entry = &self.entries[self.applied - 1];
        entry.command.undo(ctx)?;
        self.applied -= 1;

        let type_name = entry.command.type_name();
        info!(command = type_name, op_id = %entry.op_id, "Undid command");
        Ok(Some(type_name))
    }

    /// Re-applies the next undone command.
    ///
    /// Returns the command type, or `None` when there is nothing to redo.
    pub fn redo(&mut self, ctx: &mut CommandContext<'_>) -> CoreResult<Option<&'static str>> {
        let Some(entry) = self.entries.get_mut(self.applied) else {
            return Ok(None);
        };

        let result = entry.command.redo(ctx)?;
        entry.op_id = result.op_id.clone();
        entry.result = result;
        entry.timestamp = chrono::Utc::now().to_rfc3339();
        self.applied += 1;

        let type_name = entry.command.type_name();
        info!(command = type_name, op_id = %entry.op_id, "Redid command");
        Ok(Some(type_name))
    }

    /// Returns true if undo is available
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    /// Returns true if redo is available
    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Number of commands that can be undone
    pub fn undo_count(&self) -> usize {
        self.applied
    }

    /// Number of commands that can be redone
    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.applied
    }

    /// Total recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position: index of the last applied entry, -1 when none
    pub fn index(&self) -> isize {
        self.applied as isize - 1
    }

    /// Clears all history (undo and redo)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }

    /// Type of the command `undo` would revert
    pub fn last_command_type(&self) -> Option<&'static str> {
        self.applied
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| e.command.type_name())
    }

    /// Type of the command `redo` would re-apply
    pub fn last_undone_command_type(&self) -> Option<&'static str> {
        self.entries
            .get(self.applied)
            .map(|e| e.command.type_name())
    }

    /// JSON descriptions of the applied commands, oldest first
    pub fn applied_commands_json(&self) -> Vec<serde_json::Value> {
        self.entries[..self.applied]
            .iter()
            .map(|e| {
                serde_json::json!({
                    "type": e.command.type_name(),
                    "opId": e.op_id,
                    "timestamp": e.timestamp,
                    "params": e.command.to_json(),
                })
            })
            .collect()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::core::{
        edit::state::EditState, players::StandardPlayerFactory, scene::SceneTree,
        settings::EditSettings, timing::NullProbe, CoreError,
    };

    fn state() -> EditState {
        EditState::new(
            EditSettings::default(),
            Rc::new(StandardPlayerFactory::default()),
            Rc::new(NullProbe),
            Box::new(SceneTree::new()),
        )
    }

    // Test command appending/removing a value in a shared log
    struct PushCommand {
        value: i32,
        log: Rc<RefCell<Vec<i32>>>,
        fail: bool,
    }

    impl PushCommand {
        fn boxed(value: i32, log: &Rc<RefCell<Vec<i32>>>) -> Box<dyn Command> {
            Box::new(Self {
                value,
                log: log.clone(),
                fail: false,
            })
        }
    }

    impl Command for PushCommand {
        fn execute(&mut self, _ctx: &mut CommandContext<'_>) -> CoreResult<CommandResult> {
            if self.fail {
                return Err(CoreError::InvalidCommand("refused".to_string()));
            }
            self.log.borrow_mut().push(self.value);
            Ok(CommandResult::new())
        }

        fn undo(&self, _ctx: &mut CommandContext<'_>) -> CoreResult<()> {
            let mut log = self.log.borrow_mut();
            if let Some(pos) = log.iter().rposition(|v| *v == self.value) {
                log.remove(pos);
            }
            Ok(())
        }

        fn type_name(&self) -> &'static str {
            "Push"
        }

        fn to_json(&self) -> serde_json::Value {
            serde_json::json!({ "value": self.value })
        }
    }

    #[test]
    fn test_history_execute_undo_redo() {
        let mut state = state();
        let mut ctx = CommandContext::new(&mut state);
        let mut history = CommandHistory::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        history.execute(PushCommand::boxed(1, &log), &mut ctx).unwrap();
        history.execute(PushCommand::boxed(2, &log), &mut ctx).unwrap();
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(history.index(), 1);

        assert_eq!(history.undo(&mut ctx).unwrap(), Some("Push"));
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(history.index(), 0);

        assert_eq!(history.redo(&mut ctx).unwrap(), Some("Push"));
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_history_out_of_bounds_is_noop() {
        let mut state = state();
        let mut ctx = CommandContext::new(&mut state);
        let mut history = CommandHistory::new();

        assert_eq!(history.undo(&mut ctx).unwrap(), None);
        assert_eq!(history.redo(&mut ctx).unwrap(), None);
        assert_eq!(history.index(), -1);
    }

    #[test]
    fn test_history_new_command_discards_redo_tail() {
        let mut state = state();
        let mut ctx = CommandContext::new(&mut state);
        let mut history = CommandHistory::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for value in 1..=3 {
            history.execute(PushCommand::boxed(value, &log), &mut ctx).unwrap();
        }
        history.undo(&mut ctx).unwrap();
        history.execute(PushCommand::boxed(9, &log), &mut ctx).unwrap();

        assert_eq!(history.redo(&mut ctx).unwrap(), None);
        assert_eq!(history.len(), 3);
        assert_eq!(*log.borrow(), vec![1, 2, 9]);
    }

    #[test]
    fn test_history_failed_command_not_recorded() {
        let mut state = state();
        let mut ctx = CommandContext::new(&mut state);
        let mut history = CommandHistory::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let failing = Box::new(PushCommand {
            value: 1,
            log: log.clone(),
            fail: true,
        });
        assert!(history.execute(failing, &mut ctx).is_err());
        assert!(history.is_empty());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_history_max_size_drops_oldest() {
        let mut state = state();
        let mut ctx = CommandContext::new(&mut state);
        let mut history = CommandHistory::new().with_max_history(2);
        let log = Rc::new(RefCell::new(Vec::new()));

        for value in 1..=3 {
            history.execute(PushCommand::boxed(value, &log), &mut ctx).unwrap();
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo_count(), 2);

        history.undo(&mut ctx).unwrap();
        history.undo(&mut ctx).unwrap();
        assert!(!history.can_undo());
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(history.redo_count(), 2);
        assert_eq!(history.last_undone_command_type(), Some("Push"));
    }

    #[test]
    fn test_applied_commands_json() {
        let mut state = state();
        let mut ctx = CommandContext::new(&mut state);
        let mut history = CommandHistory::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        history.execute(PushCommand::boxed(7, &log), &mut ctx).unwrap();
        history.execute(PushCommand::boxed(8, &log), &mut ctx).unwrap();
        history.undo(&mut ctx).unwrap();

        let json = history.applied_commands_json();
        assert_eq!(json.len(), 1);
        assert_eq!(json[0]["type"], "Push");
        assert_eq!(json[0]["params"]["value"], 7);
        assert_eq!(history.last_command_type(), Some("Push"));
    }
}
