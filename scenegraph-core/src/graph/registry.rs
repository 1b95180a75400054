//! Graph Registry
//!
//! The [`Graph`] owns no nodes. It holds the classification of every
//! registered node, the visited-epoch counter used by traversals, the
//! session configuration and the listener list.
//!
//! # Classification
//!
//! Every registered node sits in exactly one of three sets:
//!
//! - `Original`: no ancestors, at least one descendant (a source)
//! - `Intermediate`: both ancestors and descendants
//! - `Terminal`: no descendants (a sink, including unconnected nodes)
//!
//! Membership is recomputed by [`Graph::classify`] after every edge change.

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::events::{GraphEvent, ListenerId, Listeners};
use super::node::{GraphDirection, Node, NodeArena, NodeId, NodeState};
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};

/// Topological role of a registered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// No ancestors: a source.
    Original,
    /// Both ancestors and descendants.
    Intermediate,
    /// No descendants: a sink.
    Terminal,
}

impl NodeClass {
    /// Class dictated by a node's adjacency.
    pub fn of(has_ancestors: bool, has_descendants: bool) -> Self {
        match (has_ancestors, has_descendants) {
            (_, false) => NodeClass::Terminal,
            (false, true) => NodeClass::Original,
            (true, true) => NodeClass::Intermediate,
        }
    }
}

/// Classification sets, epoch counter and listeners for one scene.
#[derive(Debug, Default)]
pub struct Graph {
    original: IndexSet<NodeId>,
    intermediate: IndexSet<NodeId>,
    terminal: IndexSet<NodeId>,
    epoch: u32,
    config: GraphConfig,
    listeners: Listeners,
}

impl Graph {
    /// Create an empty graph.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Register a node, classifying it from its current adjacency.
    pub fn add_node<K>(&mut self, node: &Node<K>) -> Result<()> {
        let id = node.id();
        if self.contains(id) {
            return Err(GraphError::AlreadyRegistered(id));
        }

        let class = NodeClass::of(!node.ancestors().is_empty(), !node.descendants().is_empty());
        self.set_mut(class).insert(id);
        tracing::trace!(?id, ?class, "node added");

        self.listeners.emit(&GraphEvent::NodeAdded(id));
        Ok(())
    }

    /// Unregister a node. Returns `false` if it was not registered.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let removed = self.original.shift_remove(&id)
            || self.intermediate.shift_remove(&id)
            || self.terminal.shift_remove(&id);

        if removed {
            tracing::trace!(?id, "node removed");
            self.listeners.emit(&GraphEvent::NodeRemoved(id));
        }
        removed
    }

    /// Unregister every node and restart the epoch counter.
    ///
    /// Fires [`GraphEvent::NodeRemoved`] for each node, in class order. Node
    /// adjacency in the arena is not touched; listeners and configuration
    /// survive.
    pub fn reset<K>(&mut self, nodes: &mut NodeArena<K>) {
        let registered: Vec<NodeId> = self.nodes().collect();
        self.original.clear();
        self.intermediate.clear();
        self.terminal.clear();
        self.reset_visited_ids(nodes);

        tracing::debug!(count = registered.len(), "graph reset");
        for id in registered {
            self.listeners.emit(&GraphEvent::NodeRemoved(id));
        }
    }

    /// Move a registered node into the set its adjacency dictates.
    ///
    /// Unregistered nodes are left alone: an edge change on a pruned node
    /// must not register it as a side effect.
    pub fn classify<K>(&mut self, node: &Node<K>) {
        let id = node.id();
        let Some(current) = self.class_of(id) else {
            return;
        };

        let class = NodeClass::of(!node.ancestors().is_empty(), !node.descendants().is_empty());
        if class != current {
            self.set_mut(current).shift_remove(&id);
            self.set_mut(class).insert(id);
        }
    }

    /// Check whether a node is registered.
    pub fn contains(&self, id: NodeId) -> bool {
        self.class_of(id).is_some()
    }

    /// The class a registered node currently sits in.
    pub fn class_of(&self, id: NodeId) -> Option<NodeClass> {
        if self.original.contains(&id) {
            Some(NodeClass::Original)
        } else if self.intermediate.contains(&id) {
            Some(NodeClass::Intermediate)
        } else if self.terminal.contains(&id) {
            Some(NodeClass::Terminal)
        } else {
            None
        }
    }

    /// Registered nodes with no ancestors and at least one descendant.
    pub fn originals(&self) -> &IndexSet<NodeId> {
        &self.original
    }

    /// Registered nodes with both ancestors and descendants.
    pub fn intermediates(&self) -> &IndexSet<NodeId> {
        &self.intermediate
    }

    /// Registered nodes with no descendants.
    pub fn terminals(&self) -> &IndexSet<NodeId> {
        &self.terminal
    }

    /// Every registered node.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.original
            .iter()
            .chain(self.intermediate.iter())
            .chain(self.terminal.iter())
            .copied()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.original.len() + self.intermediate.len() + self.terminal.len()
    }

    /// Check whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set_mut(&mut self, class: NodeClass) -> &mut IndexSet<NodeId> {
        match class {
            NodeClass::Original => &mut self.original,
            NodeClass::Intermediate => &mut self.intermediate,
            NodeClass::Terminal => &mut self.terminal,
        }
    }

    // ------------------------------------------------------------------------
    // Visited epochs
    // ------------------------------------------------------------------------

    /// Current epoch (`0` before the first traversal).
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Hand out a fresh epoch stamp for a traversal.
    ///
    /// Stamps are never reused while nodes may still carry them; on wrap the
    /// counter and every node stamp are reset first.
    pub fn assign_visited_id<K>(&mut self, nodes: &mut NodeArena<K>) -> u32 {
        if self.epoch == u32::MAX {
            self.reset_visited_ids(nodes);
        }
        self.epoch += 1;
        self.epoch
    }

    /// Clear every node's stamp and restart the epoch counter.
    pub fn reset_visited_ids<K>(&mut self, nodes: &mut NodeArena<K>) {
        for node in nodes.values_mut() {
            node.set_visited_id(0);
        }
        self.epoch = 0;
    }

    // ------------------------------------------------------------------------
    // Dirty propagation
    // ------------------------------------------------------------------------

    /// Mark `id` dirty in `direction` and flood fill along that direction's
    /// edges, stopping at nodes that are already dirty.
    ///
    /// The walk always leaves the starting node, even if it was already dirty,
    /// so neighbors connected since the last call are reached. Returns the
    /// number of nodes newly marked.
    pub fn dirty_node<K>(
        &self,
        nodes: &mut NodeArena<K>,
        id: NodeId,
        direction: GraphDirection,
    ) -> usize {
        let Some(start) = nodes.get_mut(id) else {
            return 0;
        };

        let mut count = 0;
        if !start.is_dirty(direction) {
            start.set_state(direction, NodeState::Dirty);
            count += 1;
        }

        let mut stack: SmallVec<[NodeId; 16]> = start.neighbors(direction).iter().copied().collect();
        while let Some(next) = stack.pop() {
            let Some(node) = nodes.get_mut(next) else {
                continue;
            };
            if node.is_dirty(direction) {
                continue;
            }
            node.set_state(direction, NodeState::Dirty);
            count += 1;
            stack.extend(node.neighbors(direction).iter().copied());
        }

        tracing::trace!(?id, ?direction, count, "dirtied");
        count
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    /// Register a callback for graph events.
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&GraphEvent) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Remove a callback. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Number of subscribed callbacks.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn emit(&mut self, event: &GraphEvent) {
        self.listeners.emit(event);
    }
}
