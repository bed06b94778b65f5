//! Error types for the undo/redo engine

use docgraph_tree::{GraphError, GraphId};
use thiserror::Error;

/// Errors that can occur in the undo/redo engine
#[derive(Debug, Error)]
pub enum UndoError {
    /// `start_grouping` while a transaction is already open
    #[error("A transaction is already open; nested transactions are not supported")]
    TransactionAlreadyOpen,

    /// `stop_grouping` (or a grouped record) without an open transaction
    #[error("No transaction is open")]
    NoOpenTransaction,

    /// A notification that cannot be turned into a reversible command
    #[error("Malformed notification: {0}")]
    MalformedEvent(String),

    /// A notification published by a graph other than the attached one
    #[error("Notification from graph {received} while attached to {attached}")]
    ForeignEvent {
        /// Graph the manager is attached to
        attached: GraphId,
        /// Graph that published the event
        received: GraphId,
    },

    /// `attach` while attached to a different graph
    #[error("Already attached to graph {current}; detach before attaching to {requested}")]
    AlreadyAttached {
        /// Graph the manager is attached to
        current: GraphId,
        /// Graph passed to `attach`
        requested: GraphId,
    },

    /// A graph primitive failed while replaying a command
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl UndoError {
    /// Create a new MalformedEvent error with context
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }

    /// Create a new ConfigError with context
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Result type for the undo/redo engine
pub type Result<T> = std::result::Result<T, UndoError>;
