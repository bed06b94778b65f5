//! Node identity, property maps and node snapshots

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keyed attribute values of a node.
///
/// A `BTreeMap` keeps key order stable so labels and serialized documents are
/// deterministic. A `null` value means "key absent" when written through
/// [`DocumentGraph::set_property_values`](crate::DocumentGraph::set_property_values).
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

/// Identifier of a node within one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

/// Identity of one graph instance, used to scope subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Allocate a fresh random id
    pub fn new() -> Self {
        GraphId(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node together with its whole subtree.
///
/// Structural notifications carry full snapshots so a removed subtree can be
/// re-inserted without querying the graph again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identity
    pub id: NodeId,
    /// Keyed attribute values
    #[serde(default)]
    pub properties: PropertyMap,
    /// Ordered children
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a leaf node without properties
    pub fn new(id: impl Into<NodeId>) -> Self {
        Node {
            id: id.into(),
            properties: PropertyMap::new(),
            children: Vec::new(),
        }
    }

    /// Set a property, builder style
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Append a child, builder style
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Find a node in this subtree
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Find a node in this subtree, mutably
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Parent id and child position of `id` within this subtree
    pub fn position_of(&self, id: NodeId) -> Option<(NodeId, usize)> {
        for (index, child) in self.children.iter().enumerate() {
            if child.id == id {
                return Some((self.id, index));
            }
            if let Some(found) = child.position_of(id) {
                return Some(found);
            }
        }
        None
    }

    /// Whether `id` appears anywhere in this subtree
    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// All ids in this subtree, pre-order
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<NodeId>) {
        out.push(self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// Largest id in this subtree
    pub fn max_id(&self) -> NodeId {
        self.children
            .iter()
            .map(Node::max_id)
            .fold(self.id, std::cmp::max)
    }
}
