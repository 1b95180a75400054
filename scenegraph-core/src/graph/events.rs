//! Graph change notification.
//!
//! Consumers such as a renderer or a statistics overlay subscribe a callback
//! on the graph. Delivery is synchronous, on the editing thread, in
//! subscription order.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use super::node::NodeId;

/// Unique identifier for a graph listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Nodes recomputed by one evaluation pass, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatedArgs {
    /// Nodes whose downstream state was recomputed.
    pub downstream: Vec<NodeId>,
    /// Nodes whose upstream state was recomputed.
    pub upstream: Vec<NodeId>,
}

impl EvaluatedArgs {
    /// Every node touched by the pass, each once.
    pub fn nodes(&self) -> IndexSet<NodeId> {
        self.downstream
            .iter()
            .chain(self.upstream.iter())
            .copied()
            .collect()
    }

    /// Total number of evaluations performed.
    pub fn len(&self) -> usize {
        self.downstream.len() + self.upstream.len()
    }

    /// Check whether the pass recomputed nothing.
    pub fn is_empty(&self) -> bool {
        self.downstream.is_empty() && self.upstream.is_empty()
    }
}

/// A change reported by the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// A node was registered with the graph.
    NodeAdded(NodeId),
    /// A node was unregistered from the graph.
    NodeRemoved(NodeId),
    /// An evaluation pass finished.
    Evaluated(EvaluatedArgs),
}

type Callback = Box<dyn FnMut(&GraphEvent)>;

/// Ordered list of listener callbacks.
#[derive(Default)]
pub(crate) struct Listeners {
    entries: Vec<(ListenerId, Callback)>,
}

impl Listeners {
    pub(crate) fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&GraphEvent) + 'static,
    {
        let id = ListenerId::new();
        self.entries.push((id, Box::new(callback)));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: &GraphEvent) {
        for (_, callback) in self.entries.iter_mut() {
            callback(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
