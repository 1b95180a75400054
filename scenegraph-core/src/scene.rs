//! Scene
//!
//! The scene owns the node arena and the graph for one editing session. It is
//! the node-keyed entry point used by commands, loaders and the render tick:
//! every node operation takes a [`NodeId`] and forwards to the [`Graph`] with
//! the arena it needs.

use std::cell::Ref;
use std::time::Duration;

use serde::Serialize;
use slotmap::SlotMap;

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::{
    EvaluateResult, Graph, GraphDirection, GraphEvent, ListenerId, Node, NodeArena, NodeId,
    SceneNode,
};

/// Evaluation totals accumulated across passes, for a stats overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Time spent evaluating.
    pub evaluate_time: Duration,
    /// Evaluations performed.
    pub node_count: usize,
    /// Passes run through [`Scene::evaluate`].
    pub passes: usize,
}

impl Statistics {
    fn record(&mut self, result: &EvaluateResult) {
        self.evaluate_time += result.total_time;
        self.node_count += result.node_count;
        self.passes += 1;
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Node arena plus dependency graph for one open scene.
#[derive(Debug)]
pub struct Scene<K> {
    nodes: NodeArena<K>,
    graph: Graph,
    statistics: Statistics,
}

impl<K> Default for Scene<K> {
    fn default() -> Self {
        Self::with_config(GraphConfig::default())
    }
}

impl<K> Scene<K> {
    /// Create an empty scene with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scene.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            graph: Graph::new(config),
            statistics: Statistics::default(),
        }
    }

    /// The graph's classification and configuration.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Allocate a node in the arena without registering it.
    pub fn spawn(&mut self, payload: K) -> NodeId {
        self.nodes.insert_with_key(|id| Node::new(id, payload))
    }

    /// Allocate a node and register it with the graph.
    pub fn add(&mut self, payload: K) -> NodeId {
        let id = self.spawn(payload);
        let registered = self.graph.add_node(&self.nodes[id]);
        debug_assert!(registered.is_ok(), "fresh handle already registered");
        id
    }

    /// Register an arena node with the graph.
    pub fn add_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get(id).ok_or(GraphError::UnknownNode(id))?;
        self.graph.add_node(node)
    }

    /// Unregister a node. Returns `false` if it was not registered.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        self.graph.remove_node(id)
    }

    /// Check whether a node is registered with the graph.
    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.contains(id)
    }

    /// Look up a node in the arena.
    pub fn node(&self, id: NodeId) -> Option<&Node<K>> {
        self.nodes.get(id)
    }

    /// Every node in the arena, registered or not.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node<K>)> {
        self.nodes.iter()
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node's payload.
    pub fn payload(&self, id: NodeId) -> Option<Ref<'_, K>> {
        self.nodes.get(id).map(Node::payload)
    }

    /// Mutably borrow a node's payload. Call [`Scene::dirty`] afterwards, or
    /// use [`Scene::modify`].
    pub fn payload_mut(&mut self, id: NodeId) -> Option<&mut K> {
        self.nodes.get_mut(id).map(Node::payload_mut)
    }

    /// Edit a registered node's payload and dirty it. Returns the number of
    /// nodes marked. The payload is left untouched on error.
    pub fn modify<F>(&mut self, id: NodeId, edit: F) -> Result<usize>
    where
        F: FnOnce(&mut K),
    {
        self.graph.ensure_registered(&self.nodes, id)?;
        edit(self.nodes[id].payload_mut());
        self.dirty(id)
    }

    /// Mark a node's downstream state stale and flood the mark to its
    /// dependents. Returns the number of nodes newly marked.
    pub fn dirty(&mut self, id: NodeId) -> Result<usize> {
        self.dirty_in(id, GraphDirection::Downstream)
    }

    /// Mark a node's upstream state stale and flood the mark to its
    /// ancestors.
    pub fn dirty_upstream(&mut self, id: NodeId) -> Result<usize> {
        self.dirty_in(id, GraphDirection::Upstream)
    }

    fn dirty_in(&mut self, id: NodeId, direction: GraphDirection) -> Result<usize> {
        self.graph.ensure_registered(&self.nodes, id)?;
        Ok(self.graph.dirty_node(&mut self.nodes, id, direction))
    }

    /// Low-level: add `descendant` to `ancestor`'s descendant set.
    pub fn connect_descendant(&mut self, ancestor: NodeId, descendant: NodeId) -> Result<()> {
        self.graph
            .connect_descendant(&mut self.nodes, ancestor, descendant)
    }

    /// Low-level: remove `descendant` from `ancestor`'s descendant set.
    pub fn disconnect_descendant(&mut self, ancestor: NodeId, descendant: NodeId) -> Result<()> {
        self.graph
            .disconnect_descendant(&mut self.nodes, ancestor, descendant)
    }

    /// Low-level: add `ancestor` to `descendant`'s ancestor set.
    pub fn connect_ancestor(&mut self, descendant: NodeId, ancestor: NodeId) -> Result<()> {
        self.graph
            .connect_ancestor(&mut self.nodes, descendant, ancestor)
    }

    /// Low-level: remove `ancestor` from `descendant`'s ancestor set.
    pub fn disconnect_ancestor(&mut self, descendant: NodeId, ancestor: NodeId) -> Result<()> {
        self.graph
            .disconnect_ancestor(&mut self.nodes, descendant, ancestor)
    }

    /// Make `descendant` depend on `ancestor`.
    pub fn create_dependency(&mut self, descendant: NodeId, ancestor: NodeId) -> Result<()> {
        self.graph
            .create_dependency(&mut self.nodes, descendant, ancestor)
    }

    /// Drop the dependency of `descendant` on `ancestor`.
    pub fn remove_dependency(&mut self, descendant: NodeId, ancestor: NodeId) -> Result<()> {
        self.graph
            .remove_dependency(&mut self.nodes, descendant, ancestor)
    }

    /// Detach `id` and its descendant closure from the graph.
    pub fn prune(&mut self, id: NodeId, pruned: &mut Vec<NodeId>) -> Result<()> {
        self.graph.prune(&mut self.nodes, id, pruned)
    }

    /// Reattach a previously pruned branch rooted at `id`.
    pub fn insert(&mut self, id: NodeId, inserted: &mut Vec<NodeId>) -> Result<()> {
        self.graph.insert(&mut self.nodes, id, inserted)
    }

    /// Registered ancestors of `id` whose payload satisfies `predicate`.
    pub fn ancestors_matching<P>(&self, id: NodeId, predicate: P) -> Result<Vec<NodeId>>
    where
        P: Fn(&K) -> bool,
    {
        let node = self.nodes.get(id).ok_or(GraphError::UnknownNode(id))?;
        Ok(node
            .ancestors()
            .iter()
            .copied()
            .filter(|&ancestor| self.graph.contains(ancestor))
            .filter(|&ancestor| {
                self.nodes
                    .get(ancestor)
                    .is_some_and(|n| predicate(&n.payload()))
            })
            .collect())
    }

    /// Forget an unregistered node's edges.
    pub fn reset_node(&mut self, id: NodeId) -> Result<()> {
        if self.graph.contains(id) {
            return Err(GraphError::StillRegistered(id));
        }
        self.nodes
            .get_mut(id)
            .ok_or(GraphError::UnknownNode(id))?
            .clear_edges();
        Ok(())
    }

    /// Destroy an unregistered node and hand back its payload.
    ///
    /// Neighbors still recording the node drop it from their sets.
    pub fn release(&mut self, id: NodeId) -> Result<K> {
        if self.graph.contains(id) {
            return Err(GraphError::StillRegistered(id));
        }
        let node = self.nodes.remove(id).ok_or(GraphError::UnknownNode(id))?;

        for &ancestor in node.ancestors() {
            if let Some(other) = self.nodes.get_mut(ancestor) {
                other.remove_descendant(id);
                self.graph.classify(other);
            }
        }
        for &descendant in node.descendants() {
            if let Some(other) = self.nodes.get_mut(descendant) {
                other.remove_ancestor(id);
                self.graph.classify(other);
            }
        }

        tracing::trace!(?id, "node released");
        Ok(node.into_payload())
    }

    /// Tear the scene down: unregister every node, destroy the arena and
    /// zero the statistics. Listeners and configuration are kept.
    pub fn reset(&mut self) {
        self.graph.reset(&mut self.nodes);
        self.nodes.clear();
        self.statistics.reset();
    }

    /// Register a callback for graph events.
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&GraphEvent) + 'static,
    {
        self.graph.subscribe(callback)
    }

    /// Remove a callback.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.graph.unsubscribe(id)
    }

    /// Totals accumulated by [`Scene::evaluate`].
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Zero the accumulated totals.
    pub fn reset_statistics(&mut self) {
        self.statistics.reset();
    }
}

impl<K: SceneNode> Scene<K> {
    /// Run one evaluation pass without touching the statistics.
    pub fn evaluate_graph(&mut self, silent: bool) -> EvaluateResult {
        self.graph.evaluate_graph(&mut self.nodes, silent)
    }

    /// Run one evaluation pass and add it to the statistics.
    pub fn evaluate(&mut self, silent: bool) -> EvaluateResult {
        let result = self.evaluate_graph(silent);
        self.statistics.record(&result);
        result
    }

    /// Dirty `id`, then evaluate.
    pub fn dirty_and_evaluate(&mut self, id: NodeId, silent: bool) -> Result<EvaluateResult> {
        self.dirty(id)?;
        Ok(self.evaluate(silent))
    }
}
