//! In-memory document tree
//!
//! [`TreeDocument`] is the reference [`DocumentGraph`]: a single owned root
//! with ordered children, sequential node ids and a notification bus that
//! publishes one event per effective mutation.

use serde_json::Value;
use tracing::debug;

use crate::bus::{EventBus, EventReceiver, GraphEvent, PropertyEvent, ReplaceEvent, StructureEvent};
use crate::error::{GraphError, GraphResult};
use crate::graph::{DocumentGraph, ObservableGraph};
use crate::node::{GraphId, Node, NodeId, PropertyMap};

/// Observable tree of nodes with keyed properties
#[derive(Debug)]
pub struct TreeDocument {
    id: GraphId,
    root: Node,
    next_id: u64,
    bus: EventBus,
}

impl TreeDocument {
    /// Create a document holding only an empty root with id 0
    pub fn new() -> Self {
        Self::with_root(Node::new(0))
    }

    /// Create a document from an existing tree
    pub fn with_root(root: Node) -> Self {
        let next_id = root.max_id().0 + 1;
        TreeDocument {
            id: GraphId::new(),
            root,
            next_id,
            bus: EventBus::new(),
        }
    }

    /// The root node
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Look up a node anywhere in the tree
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.root.find(id)
    }

    /// Whether a node is currently attached
    pub fn contains(&self, id: NodeId) -> bool {
        self.root.contains(id)
    }

    /// A single property value of a node
    pub fn property(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.node(id).and_then(|n| n.properties.get(key))
    }

    /// Ids of the children of `id`, in order
    pub fn children(&self, id: NodeId) -> Option<Vec<NodeId>> {
        self.node(id)
            .map(|n| n.children.iter().map(|c| c.id).collect())
    }

    /// Parent id and position of `id`; `None` for the root or unknown ids
    pub fn parent_of(&self, id: NodeId) -> Option<(NodeId, usize)> {
        self.root.position_of(id)
    }

    /// Allocate a detached node with a fresh id
    pub fn create_node(&mut self) -> Node {
        let node = Node::new(self.next_id);
        self.next_id += 1;
        node
    }

    /// Replace the whole document and publish a structure-changed event
    pub fn replace_root(&mut self, root: Node) {
        self.next_id = self.next_id.max(root.max_id().0 + 1);
        let root_id = root.id;
        self.root = root;
        debug!(graph = %self.id, root = %root_id, "document replaced");
        self.bus.publish(GraphEvent::StructureChanged(ReplaceEvent {
            graph: self.id,
            root: root_id,
        }));
    }

    /// The bus this document publishes on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Serialize the whole tree, for equality checks and diagnostics
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.root)
    }

    fn check_insert(&self, parent: NodeId, child: &Node) -> GraphResult<usize> {
        let len = self
            .node(parent)
            .map(|p| p.children.len())
            .ok_or(GraphError::NodeNotFound(parent))?;
        if let Some(dup) = child.ids().into_iter().find(|id| self.contains(*id)) {
            return Err(GraphError::DuplicateNode(dup));
        }
        Ok(len)
    }

    fn attach(&mut self, parent: NodeId, index: usize, child: Node) -> GraphResult<()> {
        self.next_id = self.next_id.max(child.max_id().0 + 1);
        let snapshot = child.clone();
        let parent_node = self
            .root
            .find_mut(parent)
            .ok_or(GraphError::NodeNotFound(parent))?;
        parent_node.children.insert(index, child);
        self.bus.publish(GraphEvent::StructureAdded(StructureEvent {
            graph: self.id,
            parent,
            child: snapshot,
            index,
        }));
        Ok(())
    }
}

impl Default for TreeDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentGraph for TreeDocument {
    fn delete_child(&mut self, child: NodeId) -> GraphResult<Node> {
        if child == self.root.id {
            return Err(GraphError::CannotRemoveRoot(child));
        }
        let (parent, index) = self
            .parent_of(child)
            .ok_or(GraphError::NodeNotFound(child))?;
        let parent_node = self
            .root
            .find_mut(parent)
            .ok_or(GraphError::NodeNotFound(parent))?;
        let removed = parent_node.children.remove(index);
        self.bus.publish(GraphEvent::StructureRemoved(StructureEvent {
            graph: self.id,
            parent,
            child: removed.clone(),
            index,
        }));
        Ok(removed)
    }

    fn append_child(&mut self, parent: NodeId, child: Node) -> GraphResult<usize> {
        let index = self.check_insert(parent, &child)?;
        self.attach(parent, index, child)?;
        Ok(index)
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: Node) -> GraphResult<()> {
        let len = self.check_insert(parent, &child)?;
        if index > len {
            return Err(GraphError::IndexOutOfBounds { parent, index, len });
        }
        self.attach(parent, index, child)
    }

    fn set_property_values(&mut self, node: NodeId, values: &PropertyMap) -> GraphResult<()> {
        let target = self
            .root
            .find_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;

        let mut old_values = PropertyMap::new();
        let mut new_values = PropertyMap::new();
        for (key, value) in values {
            let current = target.properties.get(key).cloned().unwrap_or(Value::Null);
            if &current == value {
                continue;
            }
            if value.is_null() {
                target.properties.remove(key);
            } else {
                target.properties.insert(key.clone(), value.clone());
            }
            old_values.insert(key.clone(), current);
            new_values.insert(key.clone(), value.clone());
        }

        if !new_values.is_empty() {
            self.bus.publish(GraphEvent::PropertyChanged(PropertyEvent {
                graph: self.id,
                node,
                old_values,
                new_values,
            }));
        }
        Ok(())
    }
}

impl ObservableGraph for TreeDocument {
    fn graph_id(&self) -> GraphId {
        self.id
    }

    fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }
}
