#![warn(missing_docs)]

//! Observable document graph for docgraph
//!
//! Defines the boundary the undo engine consumes: node identity and property
//! maps, the typed notification channels a graph publishes on, the mutation
//! primitives it exposes, and [`TreeDocument`], an in-memory implementation.

pub mod bus;
pub mod document;
pub mod error;
pub mod graph;
pub mod node;

// Re-export public API
pub use bus::{EventBus, EventReceiver, GraphEvent, PropertyEvent, ReplaceEvent, StructureEvent};
pub use document::TreeDocument;
pub use error::{GraphError, GraphResult};
pub use graph::{DocumentGraph, ObservableGraph};
pub use node::{GraphId, Node, NodeId, PropertyMap};
