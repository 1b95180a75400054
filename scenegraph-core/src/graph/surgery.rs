//! Graph Surgery
//!
//! [`Graph::prune`] detaches a node and every node reachable through its
//! descendants; [`Graph::insert`] puts the same branch back. Structural undo
//! (delete subtree, reparent) is built on this pair.
//!
//! # Algorithm
//!
//! Both operations stamp the branch with a fresh epoch first. An ancestor
//! edge into a branch member is then either:
//!
//! - internal (ancestor stamped): left alone, both endpoints leave or return
//!   together
//! - external (ancestor not stamped): the only edges actually cut on prune
//!   and re-made on insert
//!
//! Branch members keep their own `ancestors` / `descendants` sets while
//! pruned, which is what lets insert restore the exact topology without the
//! caller re-specifying any edge.
//!
//! Edges are restored as sets. An external ancestor gets the branch root
//! back at the end of its `descendants`, so after an undo that root is
//! visited after its former later siblings.

use smallvec::SmallVec;

use super::node::{NodeArena, NodeId};
use super::registry::Graph;
use crate::error::{GraphError, Result};

impl Graph {
    /// Unregister `root` and its descendant closure.
    ///
    /// Every branch node is appended to `pruned`, root first, each once.
    pub fn prune<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        root: NodeId,
        pruned: &mut Vec<NodeId>,
    ) -> Result<()> {
        if !nodes.contains_key(root) {
            return Err(GraphError::UnknownNode(root));
        }
        if !self.contains(root) {
            return Err(GraphError::NotRegistered(root));
        }

        let epoch = self.assign_visited_id(nodes);
        let branch = stamp_branch(nodes, root, epoch);

        for &id in &branch {
            for ancestor in external_ancestors(nodes, id, epoch) {
                self.disconnect_descendant(nodes, ancestor, id)?;
            }
        }
        for &id in &branch {
            self.remove_node(id);
        }

        tracing::trace!(?root, count = branch.len(), "pruned branch");
        pruned.extend(branch);
        Ok(())
    }

    /// Re-register `root` and its descendant closure after a [`prune`].
    ///
    /// Every branch node is appended to `inserted`, root first, each once.
    ///
    /// [`prune`]: Graph::prune
    pub fn insert<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        root: NodeId,
        inserted: &mut Vec<NodeId>,
    ) -> Result<()> {
        let node = nodes.get(root).ok_or(GraphError::UnknownNode(root))?;
        if self.contains(root) {
            return Err(GraphError::AlreadyRegistered(root));
        }
        self.add_node(node)?;

        let ancestors: SmallVec<[NodeId; 8]> = node.ancestors().iter().copied().collect();
        for ancestor in ancestors {
            if nodes.contains_key(ancestor) {
                self.connect_descendant(nodes, ancestor, root)?;
            }
        }

        let epoch = self.assign_visited_id(nodes);
        let branch = stamp_branch(nodes, root, epoch);

        for &id in branch.iter().skip(1) {
            if !self.contains(id) {
                self.add_node(&nodes[id])?;
            }
            for ancestor in external_ancestors(nodes, id, epoch) {
                self.connect_descendant(nodes, ancestor, id)?;
            }
        }

        tracing::trace!(?root, count = branch.len(), "inserted branch");
        inserted.extend(branch);
        Ok(())
    }
}

/// Stamp `root` and everything reachable through descendants with `epoch`.
///
/// Returns the branch in discovery order, root first.
fn stamp_branch<K>(nodes: &mut NodeArena<K>, root: NodeId, epoch: u32) -> Vec<NodeId> {
    let mut branch = Vec::new();
    let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();

    if let Some(node) = nodes.get_mut(root) {
        node.set_visited_id(epoch);
        branch.push(root);
        stack.push(root);
    }

    while let Some(id) = stack.pop() {
        let descendants: SmallVec<[NodeId; 8]> = match nodes.get(id) {
            Some(node) => node.descendants().iter().copied().collect(),
            None => continue,
        };
        for descendant in descendants {
            let Some(node) = nodes.get_mut(descendant) else {
                continue;
            };
            if node.visited_id() != epoch {
                node.set_visited_id(epoch);
                branch.push(descendant);
                stack.push(descendant);
            }
        }
    }

    branch
}

/// Live ancestors of `id` that are not part of the branch stamped `epoch`.
fn external_ancestors<K>(nodes: &NodeArena<K>, id: NodeId, epoch: u32) -> SmallVec<[NodeId; 8]> {
    let Some(node) = nodes.get(id) else {
        return SmallVec::new();
    };
    node.ancestors()
        .iter()
        .copied()
        .filter(|&ancestor| {
            nodes
                .get(ancestor)
                .is_some_and(|a| a.visited_id() != epoch)
        })
        .collect()
}
