//! Transaction grouping of micro-edits
//!
//! While a transaction is open, property changes are coalesced per node: the
//! first change to a node fixes the values undo will restore, every later
//! change only moves the values redo will write. Structural edits recorded in
//! the same transaction keep their arrival order and seal the pending property
//! entries, so a property change is never merged across an insert or removal.

use std::collections::HashMap;

use docgraph_tree::{NodeId, PropertyMap};

use crate::command::{Command, GroupCommand, PropertyEdit};
use crate::error::{Result, UndoError};

/// Buffer of edits belonging to the open transaction
#[derive(Debug, Default)]
pub struct TransactionGrouper {
    open: bool,
    commands: Vec<Command>,
    /// Position in `commands` of the property entry still accepting merges
    mergeable: HashMap<NodeId, usize>,
}

impl TransactionGrouper {
    /// Create a closed grouper
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction
    pub fn begin(&mut self) -> Result<()> {
        if self.open {
            return Err(UndoError::TransactionAlreadyOpen);
        }
        self.open = true;
        Ok(())
    }

    /// Record a property change, merging with an earlier change to the same node
    pub fn record(
        &mut self,
        node: NodeId,
        old_values: PropertyMap,
        new_values: PropertyMap,
    ) -> Result<()> {
        if !self.open {
            return Err(UndoError::NoOpenTransaction);
        }

        let edit = PropertyEdit::new(node, old_values, new_values)?;

        if let Some(&slot) = self.mergeable.get(&node) {
            if let Some(Command::Property(pending)) = self.commands.get_mut(slot) {
                pending.absorb(&edit.old_values, edit.new_values);
                return Ok(());
            }
        }

        self.mergeable.insert(node, self.commands.len());
        self.commands.push(Command::Property(edit));
        Ok(())
    }

    /// Record a structural command in arrival order
    pub fn record_structural(&mut self, command: Command) -> Result<()> {
        if !self.open {
            return Err(UndoError::NoOpenTransaction);
        }
        self.mergeable.clear();
        self.commands.push(command);
        Ok(())
    }

    /// Close the transaction and freeze the buffer into one group
    pub fn end(&mut self) -> Result<GroupCommand> {
        if !self.open {
            return Err(UndoError::NoOpenTransaction);
        }
        self.open = false;
        self.mergeable.clear();
        Ok(GroupCommand::new(std::mem::take(&mut self.commands)))
    }

    /// Close the transaction and discard the buffer
    pub fn abort(&mut self) -> usize {
        let dropped = self.commands.len();
        self.open = false;
        self.commands.clear();
        self.mergeable.clear();
        dropped
    }

    /// Whether a transaction is open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing has been buffered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
