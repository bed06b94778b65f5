//! History stack and cursor navigation

use serde::{Deserialize, Serialize};

use crate::command::Command;

/// Labels of every entry plus the cursor, for assertions and debugging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Entry labels, oldest first
    pub labels: Vec<String>,
    /// Index of the last applied entry, -1 when nothing is applied
    pub cursor: isize,
}

/// Linear undo/redo history.
///
/// `entries[..applied]` are applied and undoable, `entries[applied..]` were
/// undone and are redoable. The cursor reported to callers is `applied - 1`.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: Vec<Command>,
    applied: usize,
    max_entries: Option<usize>,
    /// Value of `applied` when the document was last marked clean; `None`
    /// once that state can no longer be reached through undo/redo.
    clean_at: Option<usize>,
}

impl HistoryStack {
    /// Create an unbounded, clean history
    pub fn new() -> Self {
        HistoryStack {
            entries: Vec::new(),
            applied: 0,
            max_entries: None,
            clean_at: Some(0),
        }
    }

    /// Create a history that keeps at most `max_entries` entries
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        HistoryStack {
            max_entries,
            ..Self::new()
        }
    }

    /// Record a new command, discarding the redo branch first
    pub fn push(&mut self, command: Command) {
        self.entries.truncate(self.applied);
        if matches!(self.clean_at, Some(at) if at > self.applied) {
            self.clean_at = None;
        }

        self.entries.push(command);
        self.applied += 1;

        if let Some(max) = self.max_entries {
            while self.entries.len() > max.max(1) {
                self.entries.remove(0);
                self.applied -= 1;
                self.clean_at = match self.clean_at {
                    Some(0) | None => None,
                    Some(at) => Some(at - 1),
                };
            }
        }
    }

    /// Move the cursor back and return the command to undo
    pub fn step_back(&mut self) -> Option<&Command> {
        if self.applied == 0 {
            return None;
        }
        self.applied -= 1;
        self.entries.get(self.applied)
    }

    /// Move the cursor forward and return the command to redo
    pub fn step_forward(&mut self) -> Option<&Command> {
        if self.applied >= self.entries.len() {
            return None;
        }
        self.applied += 1;
        self.entries.get(self.applied - 1)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Index of the last applied entry, -1 when nothing is applied
    pub fn cursor(&self) -> isize {
        self.applied as isize - 1
    }

    /// Entry labels, oldest first
    pub fn describe(&self) -> Vec<String> {
        self.entries.iter().map(Command::label).collect()
    }

    /// Labels plus cursor
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            labels: self.describe(),
            cursor: self.cursor(),
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[Command] {
        &self.entries
    }

    /// Number of entries, applied or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Remember the current position as the clean state
    pub fn mark_clean(&mut self) {
        self.clean_at = Some(self.applied);
    }

    /// Whether the document differs from the last clean state
    pub fn is_dirty(&self) -> bool {
        self.clean_at != Some(self.applied)
    }

    /// Drop every entry. A clean document stays clean.
    pub fn clear(&mut self) {
        let was_clean = !self.is_dirty();
        self.entries.clear();
        self.applied = 0;
        self.clean_at = if was_clean { Some(0) } else { None };
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}
