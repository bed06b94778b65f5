//! Reversible history commands and the graph operations they lower to
//!
//! A [`Command`] is plain data: it never captures the graph it was recorded
//! from. Replaying it means lowering it to [`GraphOp`]s and applying those to
//! whichever graph the caller hands in.

use std::fmt;

use docgraph_tree::{
    DocumentGraph, GraphEvent, GraphResult, Node, NodeId, PropertyEvent, PropertyMap,
    StructureEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::config::ChildPlacement;
use crate::error::{Result, UndoError};

/// A child inserted under or removed from a parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralEdit {
    /// Parent the child belongs under
    pub parent: NodeId,
    /// Snapshot of the child subtree at the time of the edit
    pub child: Node,
    /// Position among the parent's children at the time of the edit
    pub index: usize,
}

impl StructuralEdit {
    /// Build from a structural notification
    pub fn from_event(event: &StructureEvent) -> Result<Self> {
        if event.child.contains(event.parent) {
            return Err(UndoError::malformed(format!(
                "node {} is recorded under its own subtree",
                event.child.id
            )));
        }
        Ok(StructuralEdit {
            parent: event.parent,
            child: event.child.clone(),
            index: event.index,
        })
    }
}

/// Old and new values of a set of keys on one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEdit {
    /// Node whose properties changed
    pub node: NodeId,
    /// Values restored by undo
    pub old_values: PropertyMap,
    /// Values restored by redo
    pub new_values: PropertyMap,
}

impl PropertyEdit {
    /// Build a property edit, refusing change sets that cannot be inverted
    pub fn new(node: NodeId, old_values: PropertyMap, new_values: PropertyMap) -> Result<Self> {
        if new_values.is_empty() {
            return Err(UndoError::malformed(format!(
                "property change on node {} has no changed keys",
                node
            )));
        }
        if !old_values.keys().eq(new_values.keys()) {
            return Err(UndoError::malformed(format!(
                "property change on node {} has mismatched old/new keys",
                node
            )));
        }
        Ok(PropertyEdit {
            node,
            old_values,
            new_values,
        })
    }

    /// Build from a property notification
    pub fn from_event(event: &PropertyEvent) -> Result<Self> {
        Self::new(
            event.node,
            event.old_values.clone(),
            event.new_values.clone(),
        )
    }

    /// Fold a later change to the same node into this edit.
    ///
    /// New values overwrite; old values are only added for keys this edit has
    /// not seen yet, so undo still lands on the state before the first change.
    pub fn absorb(&mut self, old_values: &PropertyMap, new_values: PropertyMap) {
        for (key, value) in new_values {
            if !self.old_values.contains_key(&key) {
                let before = old_values.get(&key).cloned().unwrap_or(Value::Null);
                self.old_values.insert(key.clone(), before);
            }
            self.new_values.insert(key, value);
        }
    }

    /// Changed keys, comma separated
    pub fn keys(&self) -> String {
        self.new_values
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Several commands that undo and redo as one step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupCommand {
    commands: Vec<Command>,
}

impl GroupCommand {
    pub(crate) fn new(commands: Vec<Command>) -> Self {
        GroupCommand { commands }
    }

    /// Sub-commands in recording order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of sub-commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the group does nothing
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// One entry of the undo history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// A child was added; undo deletes it, redo re-inserts it
    Add(StructuralEdit),
    /// A child was removed; undo re-inserts it, redo deletes it
    Remove(StructuralEdit),
    /// Property values changed
    Property(PropertyEdit),
    /// A closed transaction
    Group(GroupCommand),
}

impl Command {
    /// Human-readable description for diagnostics
    pub fn label(&self) -> String {
        match self {
            Command::Add(edit) => format!("ADD {}", edit.child.id),
            Command::Remove(edit) => format!("REMOVE {}", edit.child.id),
            Command::Property(edit) => format!("PROPCHANGE {} {}", edit.node, edit.keys()),
            Command::Group(group) if group.is_empty() => "GROUP(0)".to_string(),
            Command::Group(group) => {
                let labels: Vec<String> = group.commands.iter().map(Command::label).collect();
                format!("GROUP({})[{}]", group.len(), labels.join("; "))
            }
        }
    }

    /// Steps that reverse this command, in application order
    pub fn undo_steps(&self) -> Vec<ReplayStep> {
        match self {
            Command::Add(edit) => vec![ReplayStep::new(GraphOp::delete(edit), GraphOp::insert(edit))],
            Command::Remove(edit) => vec![ReplayStep::new(GraphOp::insert(edit), GraphOp::delete(edit))],
            Command::Property(edit) => vec![ReplayStep::new(
                GraphOp::set(edit.node, &edit.old_values),
                GraphOp::set(edit.node, &edit.new_values),
            )],
            Command::Group(group) => group
                .commands
                .iter()
                .rev()
                .flat_map(Command::undo_steps)
                .collect(),
        }
    }

    /// Steps that reapply this command, in application order
    pub fn redo_steps(&self) -> Vec<ReplayStep> {
        match self {
            Command::Add(edit) => vec![ReplayStep::new(GraphOp::insert(edit), GraphOp::delete(edit))],
            Command::Remove(edit) => vec![ReplayStep::new(GraphOp::delete(edit), GraphOp::insert(edit))],
            Command::Property(edit) => vec![ReplayStep::new(
                GraphOp::set(edit.node, &edit.new_values),
                GraphOp::set(edit.node, &edit.old_values),
            )],
            Command::Group(group) => group
                .commands
                .iter()
                .flat_map(Command::redo_steps)
                .collect(),
        }
    }

    /// Operations that reverse this command, in application order
    pub fn undo_ops(&self) -> Vec<GraphOp> {
        self.undo_steps().into_iter().map(|step| step.op).collect()
    }

    /// Operations that reapply this command, in application order
    pub fn redo_ops(&self) -> Vec<GraphOp> {
        self.redo_steps().into_iter().map(|step| step.op).collect()
    }

    /// Reverse this command on `graph`, all or nothing
    pub fn apply_undo<G>(&self, graph: &mut G, placement: ChildPlacement) -> GraphResult<()>
    where
        G: DocumentGraph + ?Sized,
    {
        apply_steps(graph, &self.undo_steps(), placement)
    }

    /// Reapply this command on `graph`, all or nothing
    pub fn apply_redo<G>(&self, graph: &mut G, placement: ChildPlacement) -> GraphResult<()>
    where
        G: DocumentGraph + ?Sized,
    {
        apply_steps(graph, &self.redo_steps(), placement)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A single mutation primitive of the document graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphOp {
    /// Detach a child from its parent
    Delete {
        /// Child to detach
        child: NodeId,
    },
    /// Attach a child subtree under a parent
    Insert {
        /// Parent to attach under
        parent: NodeId,
        /// Recorded position
        index: usize,
        /// Subtree to attach
        child: Node,
    },
    /// Overwrite keyed values of a node
    SetProperties {
        /// Target node
        node: NodeId,
        /// Values to write
        values: PropertyMap,
    },
}

impl GraphOp {
    fn delete(edit: &StructuralEdit) -> Self {
        GraphOp::Delete {
            child: edit.child.id,
        }
    }

    fn set(node: NodeId, values: &PropertyMap) -> Self {
        GraphOp::SetProperties {
            node,
            values: values.clone(),
        }
    }

    fn insert(edit: &StructuralEdit) -> Self {
        GraphOp::Insert {
            parent: edit.parent,
            index: edit.index,
            child: edit.child.clone(),
        }
    }

    /// Apply this operation to a graph
    pub fn apply<G>(&self, graph: &mut G, placement: ChildPlacement) -> GraphResult<()>
    where
        G: DocumentGraph + ?Sized,
    {
        match self {
            GraphOp::Delete { child } => graph.delete_child(*child).map(|_| ()),
            GraphOp::Insert {
                parent,
                index,
                child,
            } => match placement {
                ChildPlacement::PreserveIndex => graph.insert_child(*parent, *index, child.clone()),
                ChildPlacement::Append => graph.append_child(*parent, child.clone()).map(|_| ()),
            },
            GraphOp::SetProperties { node, values } => graph.set_property_values(*node, values),
        }
    }

    /// Whether `event` is the notification this operation produces
    pub fn matches(&self, event: &GraphEvent) -> bool {
        match (self, event) {
            (GraphOp::Delete { child }, GraphEvent::StructureRemoved(e)) => e.child.id == *child,
            (GraphOp::Insert { parent, child, .. }, GraphEvent::StructureAdded(e)) => {
                e.parent == *parent && e.child.id == child.id
            }
            (GraphOp::SetProperties { node, values }, GraphEvent::PropertyChanged(e)) => {
                e.node == *node && e.new_values.keys().all(|k| values.contains_key(k))
            }
            _ => false,
        }
    }
}

/// One operation of a replay and the operation that takes it back
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    /// Operation applied by the replay
    pub op: GraphOp,
    /// Operation reverting `op` if a later step fails
    pub revert: GraphOp,
}

impl ReplayStep {
    fn new(op: GraphOp, revert: GraphOp) -> Self {
        ReplayStep { op, revert }
    }

    /// Whether `event` was caused by this step or by its revert
    pub fn matches(&self, event: &GraphEvent) -> bool {
        self.op.matches(event) || self.revert.matches(event)
    }
}

/// Apply `steps` in order. If one fails, the steps already applied are
/// reverted newest first and the original error is returned.
pub fn apply_steps<G>(graph: &mut G, steps: &[ReplayStep], placement: ChildPlacement) -> GraphResult<()>
where
    G: DocumentGraph + ?Sized,
{
    for (applied, step) in steps.iter().enumerate() {
        if let Err(err) = step.op.apply(graph, placement) {
            for done in steps[..applied].iter().rev() {
                if let Err(revert_err) = done.revert.apply(graph, placement) {
                    error!(error = %revert_err, "rollback failed; graph left partially replayed");
                    break;
                }
            }
            return Err(err);
        }
    }
    Ok(())
}
