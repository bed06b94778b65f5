#![warn(missing_docs)]

//! Structural undo/redo for docgraph documents
//!
//! An [`UndoManager`] subscribes to a document graph's notifications, turns
//! every structural insert, removal and property change into a reversible
//! [`Command`], and replays those commands through the graph's own mutation
//! primitives. Micro-edits made between `start_grouping` and `stop_grouping`
//! collapse into one history entry, and the edits a replay causes are never
//! recorded again.

pub mod command;
pub mod config;
pub mod error;
pub mod grouper;
pub mod history;
pub mod manager;
pub mod replay;

// Re-export public API
pub use command::{
    apply_steps, Command, GraphOp, GroupCommand, PropertyEdit, ReplayStep, StructuralEdit,
};
pub use config::{ChildPlacement, UndoConfig};
pub use error::{Result, UndoError};
pub use grouper::TransactionGrouper;
pub use history::{HistorySnapshot, HistoryStack};
pub use manager::{ReplayDirection, UndoManager};
pub use replay::{AsyncDocumentGraph, SharedUndoManager};
