//! Undo manager: turns graph notifications into history and replays it
//!
//! The manager is the only subscriber that records history for a document,
//! the only writer of its [`HistoryStack`], and the only component that
//! mutates the graph on behalf of undo/redo. While it replays a command the
//! re-entrancy guard is set, and the notifications the replay itself causes
//! are drained and dropped instead of being recorded again.

use std::fmt;

use docgraph_tree::{
    DocumentGraph, EventReceiver, GraphEvent, GraphId, ObservableGraph, PropertyEvent,
    ReplaceEvent, StructureEvent,
};
use tracing::{debug, error, info, warn};

use crate::command::{apply_steps, Command, PropertyEdit, ReplayStep, StructuralEdit};
use crate::config::UndoConfig;
use crate::error::{Result, UndoError};
use crate::grouper::TransactionGrouper;
use crate::history::{HistorySnapshot, HistoryStack};

/// Which way a replay moves through history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayDirection {
    /// Reverse the last applied entry
    Undo,
    /// Reapply the next undone entry
    Redo,
}

impl fmt::Display for ReplayDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayDirection::Undo => write!(f, "undo"),
            ReplayDirection::Redo => write!(f, "redo"),
        }
    }
}

#[derive(Debug)]
struct Subscription {
    graph: GraphId,
    receiver: EventReceiver,
}

/// Records edits of one document and replays them on demand
#[derive(Debug)]
pub struct UndoManager {
    config: UndoConfig,
    history: HistoryStack,
    grouper: TransactionGrouper,
    locked: bool,
    subscription: Option<Subscription>,
}

impl UndoManager {
    /// Create a manager with the default configuration
    pub fn new() -> Self {
        Self::build(UndoConfig::default())
    }

    /// Create a manager with a validated configuration
    pub fn with_config(config: UndoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: UndoConfig) -> Self {
        UndoManager {
            history: HistoryStack::with_max_entries(config.max_entries),
            grouper: TransactionGrouper::new(),
            locked: false,
            subscription: None,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &UndoConfig {
        &self.config
    }

    /// Subscribe to a graph's notifications.
    ///
    /// Attaching again to the same graph is a no-op; attaching to another
    /// graph requires [`detach`](Self::detach) first.
    pub fn attach<G>(&mut self, graph: &G) -> Result<()>
    where
        G: ObservableGraph + ?Sized,
    {
        let requested = graph.graph_id();
        if let Some(subscription) = &self.subscription {
            if subscription.graph == requested {
                debug!(graph = %requested, "already attached");
                return Ok(());
            }
            return Err(UndoError::AlreadyAttached {
                current: subscription.graph,
                requested,
            });
        }

        self.subscription = Some(Subscription {
            graph: requested,
            receiver: graph.subscribe(),
        });
        info!(graph = %requested, "undo manager attached");
        Ok(())
    }

    /// Record pending notifications, then drop the subscription.
    ///
    /// History is kept. Returns the graph that was detached from.
    pub fn detach(&mut self) -> Option<GraphId> {
        self.pump_events();
        let detached = self.subscription.take().map(|s| s.graph);
        if let Some(graph) = detached {
            info!(graph = %graph, "undo manager detached");
        }
        detached
    }

    /// Graph this manager is subscribed to
    pub fn attached_graph(&self) -> Option<GraphId> {
        self.subscription.as_ref().map(|s| s.graph)
    }

    /// Handle every queued notification, in publication order.
    ///
    /// Returns how many notifications were taken off the bus.
    pub fn pump_events(&mut self) -> usize {
        let events = match self.subscription.as_mut() {
            Some(subscription) => subscription.receiver.drain(),
            None => return 0,
        };
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        count
    }

    /// Dispatch one notification to its handler.
    ///
    /// Handler failures are logged and swallowed: a notification that cannot
    /// be recorded must not interrupt editing.
    pub fn handle_event(&mut self, event: GraphEvent) {
        let kind = event.kind();
        let result = match &event {
            GraphEvent::StructureChanged(e) => self.on_structure_changed(e),
            GraphEvent::StructureAdded(e) => self.on_structure_added(e),
            GraphEvent::StructureRemoved(e) => self.on_structure_removed(e),
            GraphEvent::PropertyChanged(e) => self.on_property_changed(e),
        };
        if let Err(err) = result {
            error!(kind, graph = %event.graph(), error = %err, "notification not recorded");
        }
    }

    /// Record an inserted child
    pub fn on_structure_added(&mut self, event: &StructureEvent) -> Result<()> {
        if self.ignoring("structure_added") {
            return Ok(());
        }
        self.check_origin(event.graph)?;
        let command = Command::Add(StructuralEdit::from_event(event)?);
        self.record_structural(command)
    }

    /// Record a removed child
    pub fn on_structure_removed(&mut self, event: &StructureEvent) -> Result<()> {
        if self.ignoring("structure_removed") {
            return Ok(());
        }
        self.check_origin(event.graph)?;
        let command = Command::Remove(StructuralEdit::from_event(event)?);
        self.record_structural(command)
    }

    /// Record changed property values, grouping them if a transaction is open
    pub fn on_property_changed(&mut self, event: &PropertyEvent) -> Result<()> {
        if self.ignoring("property_changed") {
            return Ok(());
        }
        self.check_origin(event.graph)?;

        if self.grouper.is_open() {
            debug!(node = %event.node, "grouped property change");
            return self.grouper.record(
                event.node,
                event.old_values.clone(),
                event.new_values.clone(),
            );
        }

        let command = Command::Property(PropertyEdit::from_event(event)?);
        self.push(command);
        Ok(())
    }

    /// React to a whole-document replace
    pub fn on_structure_changed(&mut self, event: &ReplaceEvent) -> Result<()> {
        if self.ignoring("structure_changed") {
            return Ok(());
        }
        self.check_origin(event.graph)?;

        if !self.config.reset_on_replace {
            info!(root = %event.root, "document replaced; history kept");
            return Ok(());
        }

        if self.grouper.is_open() {
            let dropped = self.grouper.abort();
            warn!(dropped, "document replaced during a transaction; buffered edits discarded");
        }
        let entries = self.history.len();
        self.history.clear();
        warn!(root = %event.root, entries, "document replaced; history cleared");
        Ok(())
    }

    /// Reverse the last applied entry.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. If a graph
    /// primitive fails, the operations already applied are reverted and the
    /// cursor is left where it was.
    pub fn undo<G>(&mut self, graph: &mut G) -> Result<bool>
    where
        G: DocumentGraph + ?Sized,
    {
        self.replay(graph, ReplayDirection::Undo)
    }

    /// Reapply the next undone entry.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo<G>(&mut self, graph: &mut G) -> Result<bool>
    where
        G: DocumentGraph + ?Sized,
    {
        self.replay(graph, ReplayDirection::Redo)
    }

    fn replay<G>(&mut self, graph: &mut G, direction: ReplayDirection) -> Result<bool>
    where
        G: DocumentGraph + ?Sized,
    {
        let Some(steps) = self.begin_replay(direction) else {
            return Ok(false);
        };
        let result = apply_steps(graph, &steps, self.config.child_placement);
        self.finish_replay(direction, &steps, result.is_ok());
        match result {
            Ok(()) => Ok(true),
            Err(err) => {
                error!(%direction, error = %err, "replay failed; cursor restored");
                Err(err.into())
            }
        }
    }

    /// Move the cursor and lock the manager for a replay.
    ///
    /// Returns the steps to apply, or `None` if there is nothing to
    /// replay in this direction. Must be paired with
    /// [`finish_replay`](Self::finish_replay).
    pub(crate) fn begin_replay(&mut self, direction: ReplayDirection) -> Option<Vec<ReplayStep>> {
        self.pump_events();

        if self.grouper.is_open() {
            warn!(%direction, "transaction still open; committing it before replay");
            self.commit_transaction();
        }

        let command = match direction {
            ReplayDirection::Undo => self.history.step_back(),
            ReplayDirection::Redo => self.history.step_forward(),
        };
        let Some(command) = command else {
            info!("no {}s left", direction);
            return None;
        };

        let label = command.label();
        let steps = match direction {
            ReplayDirection::Undo => command.undo_steps(),
            ReplayDirection::Redo => command.redo_steps(),
        };
        self.locked = true;
        debug!(%direction, %label, "replaying");
        Some(steps)
    }

    /// Drop the replay's own notifications and release the lock.
    ///
    /// On failure the cursor is moved back to where it was before
    /// [`begin_replay`](Self::begin_replay).
    pub(crate) fn finish_replay(
        &mut self,
        direction: ReplayDirection,
        steps: &[ReplayStep],
        succeeded: bool,
    ) {
        self.discard_replay_echoes(steps);
        if !succeeded {
            match direction {
                ReplayDirection::Undo => self.history.step_forward(),
                ReplayDirection::Redo => self.history.step_back(),
            };
        }
        self.locked = false;
        self.dump();
    }

    fn discard_replay_echoes(&mut self, steps: &[ReplayStep]) {
        let Some(subscription) = self.subscription.as_mut() else {
            return;
        };
        for event in subscription.receiver.drain() {
            if steps.iter().any(|step| step.matches(&event)) {
                debug!(kind = event.kind(), "ignoring replay notification");
            } else {
                warn!(
                    kind = event.kind(),
                    "notification during replay does not match the replayed command; not recorded"
                );
            }
        }
    }

    /// Open a transaction; nested transactions are refused
    pub fn start_grouping(&mut self) -> Result<()> {
        self.pump_events();
        self.grouper.begin().map_err(|err| {
            error!(error = %err, "start_grouping refused");
            err
        })?;
        debug!("transaction opened");
        Ok(())
    }

    /// Close the transaction and record it as one entry.
    ///
    /// Returns whether an entry was pushed; an empty transaction is only
    /// recorded when `record_empty_groups` is set.
    pub fn stop_grouping(&mut self) -> Result<bool> {
        self.pump_events();
        if !self.grouper.is_open() {
            error!("stop_grouping without an open transaction");
            return Err(UndoError::NoOpenTransaction);
        }
        Ok(self.commit_transaction())
    }

    fn commit_transaction(&mut self) -> bool {
        let group = match self.grouper.end() {
            Ok(group) => group,
            Err(_) => return false,
        };
        if group.is_empty() && !self.config.record_empty_groups {
            debug!("transaction closed without edits; nothing recorded");
            return false;
        }
        self.push(Command::Group(group));
        true
    }

    /// Whether a transaction is open
    pub fn is_grouping(&self) -> bool {
        self.grouper.is_open()
    }

    /// Entries buffered in the open transaction
    pub fn pending_group_len(&self) -> usize {
        self.grouper.len()
    }

    /// Whether a replay is in progress
    pub fn is_replaying(&self) -> bool {
        self.locked
    }

    /// Check if undo is available.
    ///
    /// Like the other read-only accessors this only sees notifications that
    /// were already pumped; call [`refresh`](Self::refresh) or
    /// [`pump_events`](Self::pump_events) first to include pending edits.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available, as of the last pump
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Index of the last applied entry, -1 when nothing is applied.
    /// Pending notifications are not included.
    pub fn cursor(&self) -> isize {
        self.history.cursor()
    }

    /// Record pending notifications and return the up-to-date snapshot
    pub fn refresh(&mut self) -> HistorySnapshot {
        self.pump_events();
        self.history.snapshot()
    }

    /// Entry labels, oldest first, as of the last pump
    pub fn describe(&self) -> Vec<String> {
        self.history.describe()
    }

    /// Labels plus cursor
    pub fn snapshot(&self) -> HistorySnapshot {
        self.history.snapshot()
    }

    /// The underlying history
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Log the stack and cursor at debug level
    pub fn dump(&self) {
        debug!(
            stack = %self.history.describe().join(", "),
            cursor = self.history.cursor(),
            "current stack"
        );
    }

    /// Remember the current position as the clean state
    pub fn mark_clean(&mut self) {
        self.history.mark_clean();
    }

    /// Whether the document differs from the last clean state
    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    /// Drop all history and any open transaction
    pub fn clear(&mut self) {
        if self.grouper.is_open() {
            self.grouper.abort();
        }
        self.history.clear();
        debug!("history cleared");
    }

    fn ignoring(&self, kind: &'static str) -> bool {
        if self.locked {
            debug!(kind, "replay in progress; notification ignored");
        }
        self.locked
    }

    fn check_origin(&self, graph: GraphId) -> Result<()> {
        match &self.subscription {
            Some(subscription) if subscription.graph != graph => Err(UndoError::ForeignEvent {
                attached: subscription.graph,
                received: graph,
            }),
            _ => Ok(()),
        }
    }

    fn record_structural(&mut self, command: Command) -> Result<()> {
        if self.grouper.is_open() && self.config.group_structural_edits {
            debug!(label = %command.label(), "grouped structural edit");
            return self.grouper.record_structural(command);
        }
        self.push(command);
        Ok(())
    }

    /// Truncate the redo branch and append
    fn push(&mut self, command: Command) {
        debug!(label = %command.label(), "recorded");
        self.history.push(command);
        self.dump();
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}
