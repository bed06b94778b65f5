//! Contract between a document graph and the components that edit it

use crate::bus::EventReceiver;
use crate::error::GraphResult;
use crate::node::{GraphId, Node, NodeId, PropertyMap};

/// Mutation primitives of a document graph.
///
/// Every effective mutation must publish exactly one matching notification on
/// the graph's bus; writes that change nothing publish nothing.
pub trait DocumentGraph {
    /// Detach `child` from its parent and return the detached subtree
    fn delete_child(&mut self, child: NodeId) -> GraphResult<Node>;

    /// Attach `child` as the last child of `parent`, returning its position
    fn append_child(&mut self, parent: NodeId, child: Node) -> GraphResult<usize>;

    /// Attach `child` at `index` among the children of `parent`
    fn insert_child(&mut self, parent: NodeId, index: usize, child: Node) -> GraphResult<()>;

    /// Overwrite exactly the given keys of `node`; a `null` value clears the key
    fn set_property_values(&mut self, node: NodeId, values: &PropertyMap) -> GraphResult<()>;
}

/// A graph that publishes [`GraphEvent`](crate::GraphEvent)s
pub trait ObservableGraph {
    /// Identity of this graph instance
    fn graph_id(&self) -> GraphId;

    /// Open a new subscription to this graph's notifications
    fn subscribe(&self) -> EventReceiver;
}
