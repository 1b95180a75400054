//! Graph Nodes
//!
//! This module defines the node type that lives in the scene arena, the
//! per-direction evaluation state, and the contract that payloads (transforms,
//! curves, lights, skins, ...) implement to compute their derived state.

use std::cell::{Ref, RefCell};

use indexmap::IndexSet;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node in a [`Scene`](crate::Scene) arena.
    ///
    /// Handles are generational: once a node is released, its handle never
    /// resolves to a different node.
    pub struct NodeId;
}

/// Arena that owns every node of a scene.
pub type NodeArena<K> = SlotMap<NodeId, Node<K>>;

/// Direction along which dirtiness flows and evaluation pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphDirection {
    /// Towards ancestors: a node's upstream state depends on its descendants
    /// (for example, hierarchy bounds accumulated from children).
    Upstream,

    /// Towards descendants: a node's downstream state depends on its
    /// ancestors (for example, world transforms).
    Downstream,
}

impl GraphDirection {
    /// Both directions, in evaluation order.
    pub const ALL: [GraphDirection; 2] = [GraphDirection::Downstream, GraphDirection::Upstream];

    fn index(self) -> usize {
        match self {
            GraphDirection::Upstream => 0,
            GraphDirection::Downstream => 1,
        }
    }
}

/// Evaluation state of a node in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Derived state is current.
    Clean,

    /// Derived state is stale and must be recomputed before use.
    Dirty,

    /// `evaluate` is running for this node.
    Evaluating,
}

/// Per-kind payload of a scene node.
///
/// This is the only behavior the graph requires from concrete node kinds.
/// A scene usually picks a closed enum over its node kinds as `K`.
pub trait SceneNode: Sized {
    /// Recompute this node's derived state for `direction`.
    ///
    /// For [`GraphDirection::Downstream`] every ancestor is already clean; for
    /// [`GraphDirection::Upstream`] every descendant is. Only `self` may be
    /// mutated; other payloads are readable through `ctx`.
    fn evaluate(&mut self, direction: GraphDirection, ctx: &EvalContext<'_, Self>);

    /// Short label used in tracing spans.
    fn label(&self) -> &str {
        "node"
    }
}

/// A vertex of the dependency graph.
///
/// `ancestors` and `descendants` are non-owning handle sets. They are kept in
/// insertion order so traversals are deterministic.
#[derive(Debug)]
pub struct Node<K> {
    id: NodeId,
    ancestors: IndexSet<NodeId>,
    descendants: IndexSet<NodeId>,
    states: [NodeState; 2],
    visited: u32,
    payload: RefCell<K>,
}

impl<K> Node<K> {
    /// Create an unconnected node. Nodes start dirty in both directions.
    pub(crate) fn new(id: NodeId, payload: K) -> Self {
        Self {
            id,
            ancestors: IndexSet::new(),
            descendants: IndexSet::new(),
            states: [NodeState::Dirty; 2],
            visited: 0,
            payload: RefCell::new(payload),
        }
    }

    /// Get the node's handle.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Nodes this node's derived state depends on.
    pub fn ancestors(&self) -> &IndexSet<NodeId> {
        &self.ancestors
    }

    /// Nodes that depend on this node.
    pub fn descendants(&self) -> &IndexSet<NodeId> {
        &self.descendants
    }

    /// Neighbors along `direction`'s dirty-propagation edges.
    pub(crate) fn neighbors(&self, direction: GraphDirection) -> &IndexSet<NodeId> {
        match direction {
            GraphDirection::Downstream => &self.descendants,
            GraphDirection::Upstream => &self.ancestors,
        }
    }

    /// Neighbors that must be clean before this node evaluates in `direction`.
    pub(crate) fn prerequisites(&self, direction: GraphDirection) -> &IndexSet<NodeId> {
        match direction {
            GraphDirection::Downstream => &self.ancestors,
            GraphDirection::Upstream => &self.descendants,
        }
    }

    /// Get the evaluation state for a direction.
    pub fn state(&self, direction: GraphDirection) -> NodeState {
        self.states[direction.index()]
    }

    pub(crate) fn set_state(&mut self, direction: GraphDirection, state: NodeState) {
        self.states[direction.index()] = state;
    }

    /// Check if the node's derived state is current in `direction`.
    pub fn is_clean(&self, direction: GraphDirection) -> bool {
        self.state(direction) == NodeState::Clean
    }

    /// Check if the node is marked for recomputation in `direction`.
    pub fn is_dirty(&self, direction: GraphDirection) -> bool {
        self.state(direction) == NodeState::Dirty
    }

    /// Epoch of the last traversal that touched this node (`0` = never).
    pub fn visited_id(&self) -> u32 {
        self.visited
    }

    pub(crate) fn set_visited_id(&mut self, id: u32) {
        self.visited = id;
    }

    /// Borrow the payload.
    ///
    /// # Panics
    ///
    /// Panics if called from inside this node's own `evaluate`.
    pub fn payload(&self) -> Ref<'_, K> {
        self.payload.borrow()
    }

    /// Mutably borrow the payload.
    pub fn payload_mut(&mut self) -> &mut K {
        self.payload.get_mut()
    }

    pub(crate) fn into_payload(self) -> K {
        self.payload.into_inner()
    }

    pub(crate) fn insert_ancestor(&mut self, id: NodeId) -> bool {
        self.ancestors.insert(id)
    }

    pub(crate) fn remove_ancestor(&mut self, id: NodeId) -> bool {
        self.ancestors.shift_remove(&id)
    }

    pub(crate) fn insert_descendant(&mut self, id: NodeId) -> bool {
        self.descendants.insert(id)
    }

    pub(crate) fn remove_descendant(&mut self, id: NodeId) -> bool {
        self.descendants.shift_remove(&id)
    }

    pub(crate) fn clear_edges(&mut self) {
        self.ancestors.clear();
        self.descendants.clear();
    }
}

impl<K: SceneNode> Node<K> {
    /// Run the payload's `evaluate` for this node.
    ///
    /// Only flips `Evaluating` back to `Clean`: if the node was re-marked
    /// while evaluating, it stays dirty for the next pass.
    pub(crate) fn do_evaluate(nodes: &mut NodeArena<K>, id: NodeId, direction: GraphDirection) {
        let Some(node) = nodes.get_mut(id) else {
            return;
        };
        debug_assert_eq!(node.state(direction), NodeState::Dirty, "evaluating a clean node");
        node.set_state(direction, NodeState::Evaluating);

        {
            let nodes = &*nodes;
            let node = &nodes[id];
            let mut payload = node.payload.borrow_mut();
            let _span =
                tracing::trace_span!("evaluate", kind = payload.label(), ?direction).entered();
            let ctx = EvalContext { nodes, node };
            payload.evaluate(direction, &ctx);
        }

        let node = &mut nodes[id];
        if node.state(direction) == NodeState::Evaluating {
            node.set_state(direction, NodeState::Clean);
        }
    }
}

/// Read-only view of the scene handed to [`SceneNode::evaluate`].
pub struct EvalContext<'a, K> {
    nodes: &'a NodeArena<K>,
    node: &'a Node<K>,
}

impl<'a, K> EvalContext<'a, K> {
    /// Handle of the node being evaluated.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Payloads of this node's ancestors, in edge insertion order.
    pub fn ancestors(&self) -> impl Iterator<Item = (NodeId, Ref<'a, K>)> + 'a {
        let nodes = self.nodes;
        let node = self.node;
        node.ancestors
            .iter()
            .filter_map(move |&id| Some((id, nodes.get(id)?.payload.try_borrow().ok()?)))
    }

    /// Payloads of this node's descendants, in edge insertion order.
    pub fn descendants(&self) -> impl Iterator<Item = (NodeId, Ref<'a, K>)> + 'a {
        let nodes = self.nodes;
        let node = self.node;
        node.descendants
            .iter()
            .filter_map(move |&id| Some((id, nodes.get(id)?.payload.try_borrow().ok()?)))
    }

    /// Any other node's payload. Returns `None` for the node being evaluated.
    pub fn payload(&self, id: NodeId) -> Option<Ref<'a, K>> {
        self.nodes.get(id)?.payload.try_borrow().ok()
    }
}
