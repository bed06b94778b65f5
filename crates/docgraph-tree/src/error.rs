//! Error types for document graph mutations

use thiserror::Error;

use crate::node::NodeId;

/// Errors raised by [`DocumentGraph`](crate::DocumentGraph) primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No node with this id exists in the document
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node with this id is already part of the document
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// The document root has no parent and cannot be detached
    #[error("Cannot remove the document root ({0})")]
    CannotRemoveRoot(NodeId),

    /// Insert position is past the end of the parent's children
    #[error("Index {index} out of bounds for parent {parent} with {len} children")]
    IndexOutOfBounds {
        /// Parent the insert targeted
        parent: NodeId,
        /// Requested position
        index: usize,
        /// Current number of children
        len: usize,
    },

    /// Backend-specific failure (remote graphs, storage layers)
    #[error("Graph backend error: {0}")]
    Backend(String),
}

impl GraphError {
    /// Create a new Backend error with context
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result type for graph primitives
pub type GraphResult<T> = std::result::Result<T, GraphError>;
