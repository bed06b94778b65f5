//! Notification payloads published by a document graph
//!
//! Each payload carries enough data to build the inverse operation without
//! re-querying the graph: structural events carry the full child snapshot and
//! its position, property events carry both pre- and post-images restricted to
//! the keys that changed.

use serde::{Deserialize, Serialize};

use crate::node::{GraphId, Node, NodeId, PropertyMap};

/// A child was inserted under, or removed from, a parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEvent {
    /// Graph that emitted the event
    pub graph: GraphId,
    /// Parent the child was attached to
    pub parent: NodeId,
    /// Snapshot of the child subtree
    pub child: Node,
    /// Position of the child among the parent's children
    pub index: usize,
}

/// One or more keyed values of a node changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEvent {
    /// Graph that emitted the event
    pub graph: GraphId,
    /// Node whose properties changed
    pub node: NodeId,
    /// Values before the edit (`null` for keys that did not exist)
    pub old_values: PropertyMap,
    /// Values after the edit (`null` for keys that were cleared)
    pub new_values: PropertyMap,
}

/// The whole document was replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceEvent {
    /// Graph that emitted the event
    pub graph: GraphId,
    /// Id of the new root
    pub root: NodeId,
}

/// Typed notification channels of a document graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphEvent {
    /// Whole-document replace
    StructureChanged(ReplaceEvent),
    /// Child inserted
    StructureAdded(StructureEvent),
    /// Child removed
    StructureRemoved(StructureEvent),
    /// Property values changed
    PropertyChanged(PropertyEvent),
}

impl GraphEvent {
    /// Graph that emitted this event
    pub fn graph(&self) -> GraphId {
        match self {
            GraphEvent::StructureChanged(e) => e.graph,
            GraphEvent::StructureAdded(e) | GraphEvent::StructureRemoved(e) => e.graph,
            GraphEvent::PropertyChanged(e) => e.graph,
        }
    }

    /// Short channel name, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            GraphEvent::StructureChanged(_) => "structure_changed",
            GraphEvent::StructureAdded(_) => "structure_added",
            GraphEvent::StructureRemoved(_) => "structure_removed",
            GraphEvent::PropertyChanged(_) => "property_changed",
        }
    }
}
