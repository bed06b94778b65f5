//! Asynchronous replay against graphs whose primitives suspend
//!
//! [`SharedUndoManager`] wraps an [`UndoManager`] in a tokio mutex so that at
//! most one undo or redo is in flight at a time: a second request waits until
//! the first has finished applying its operations. The lock is held across
//! every await of a replay, and a guard restores the cursor and releases the
//! re-entrancy lock if the replay future is dropped before it completes.

use std::sync::Arc;

use async_trait::async_trait;
use docgraph_tree::{GraphResult, Node, NodeId, PropertyMap};
use tokio::sync::{Mutex, MutexGuard};
use tracing::error;

use crate::command::{GraphOp, ReplayStep};
use crate::config::ChildPlacement;
use crate::error::Result;
use crate::manager::{ReplayDirection, UndoManager};

/// Mutation primitives of a graph that is edited asynchronously
#[async_trait]
pub trait AsyncDocumentGraph: Send + Sync {
    /// Detach `child` from its parent and return the detached subtree
    async fn delete_child(&self, child: NodeId) -> GraphResult<Node>;

    /// Attach `child` as the last child of `parent`, returning its position
    async fn append_child(&self, parent: NodeId, child: Node) -> GraphResult<usize>;

    /// Attach `child` at `index` among the children of `parent`
    async fn insert_child(&self, parent: NodeId, index: usize, child: Node) -> GraphResult<()>;

    /// Overwrite exactly the given keys of `node`; a `null` value clears the key
    async fn set_property_values(&self, node: NodeId, values: PropertyMap) -> GraphResult<()>;
}

async fn apply_op_async<G>(op: &GraphOp, graph: &G, placement: ChildPlacement) -> GraphResult<()>
where
    G: AsyncDocumentGraph + ?Sized,
{
    match op {
        GraphOp::Delete { child } => graph.delete_child(*child).await.map(|_| ()),
        GraphOp::Insert {
            parent,
            index,
            child,
        } => match placement {
            ChildPlacement::PreserveIndex => {
                graph.insert_child(*parent, *index, child.clone()).await
            }
            ChildPlacement::Append => graph
                .append_child(*parent, child.clone())
                .await
                .map(|_| ()),
        },
        GraphOp::SetProperties { node, values } => {
            graph.set_property_values(*node, values.clone()).await
        }
    }
}

/// Apply `steps` in order, reverting the applied prefix newest first if one fails
async fn apply_steps_async<G>(
    graph: &G,
    steps: &[ReplayStep],
    placement: ChildPlacement,
) -> GraphResult<()>
where
    G: AsyncDocumentGraph + ?Sized,
{
    for (applied, step) in steps.iter().enumerate() {
        if let Err(err) = apply_op_async(&step.op, graph, placement).await {
            for done in steps[..applied].iter().rev() {
                if let Err(revert_err) = apply_op_async(&done.revert, graph, placement).await {
                    error!(error = %revert_err, "rollback failed; graph left partially replayed");
                    break;
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Holds the manager for the duration of one replay
struct ReplayGuard<'a> {
    manager: MutexGuard<'a, UndoManager>,
    direction: ReplayDirection,
    steps: Vec<ReplayStep>,
    finished: bool,
}

impl ReplayGuard<'_> {
    fn finish(&mut self, succeeded: bool) {
        self.manager
            .finish_replay(self.direction, &self.steps, succeeded);
        self.finished = true;
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            error!(direction = %self.direction, "replay abandoned; cursor restored");
            self.finish(false);
        }
    }
}

/// Cloneable handle to an [`UndoManager`] with single-flight async replay
#[derive(Debug, Clone)]
pub struct SharedUndoManager {
    inner: Arc<Mutex<UndoManager>>,
}

impl SharedUndoManager {
    /// Wrap a manager
    pub fn new(manager: UndoManager) -> Self {
        SharedUndoManager {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Exclusive access for recording, grouping and queries
    pub async fn lock(&self) -> MutexGuard<'_, UndoManager> {
        self.inner.lock().await
    }

    /// Reverse the last applied entry on an async graph
    pub async fn undo<G>(&self, graph: &G) -> Result<bool>
    where
        G: AsyncDocumentGraph + ?Sized,
    {
        self.replay(graph, ReplayDirection::Undo).await
    }

    /// Reapply the next undone entry on an async graph
    pub async fn redo<G>(&self, graph: &G) -> Result<bool>
    where
        G: AsyncDocumentGraph + ?Sized,
    {
        self.replay(graph, ReplayDirection::Redo).await
    }

    async fn replay<G>(&self, graph: &G, direction: ReplayDirection) -> Result<bool>
    where
        G: AsyncDocumentGraph + ?Sized,
    {
        let mut manager = self.inner.lock().await;
        let Some(steps) = manager.begin_replay(direction) else {
            return Ok(false);
        };
        let placement = manager.config().child_placement;
        let mut guard = ReplayGuard {
            manager,
            direction,
            steps,
            finished: false,
        };

        let result = apply_steps_async(graph, &guard.steps, placement).await;
        guard.finish(result.is_ok());

        match result {
            Ok(()) => Ok(true),
            Err(err) => {
                error!(%direction, error = %err, "replay failed; cursor restored");
                Err(err.into())
            }
        }
    }
}
