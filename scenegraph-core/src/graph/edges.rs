//! Edge mutation.
//!
//! Edges are stored in both endpoints. The `connect_*` / `disconnect_*`
//! primitives touch one endpoint each and re-classify both; the
//! `create_dependency` / `remove_dependency` pair keeps the two sides in step.

use smallvec::SmallVec;

use super::node::{GraphDirection, NodeArena, NodeId};
use super::registry::Graph;
use crate::error::{GraphError, Result};

impl Graph {
    /// Record `descendant` in `ancestor`'s descendant set.
    ///
    /// The descendant's inputs changed, so it is dirtied downstream; the
    /// ancestor's set of children changed, so it is dirtied upstream.
    pub fn connect_descendant<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        ancestor: NodeId,
        descendant: NodeId,
    ) -> Result<()> {
        ensure_live(nodes, descendant)?;
        nodes
            .get_mut(ancestor)
            .ok_or(GraphError::UnknownNode(ancestor))?
            .insert_descendant(descendant);

        self.reclassify(nodes, ancestor, descendant);
        self.dirty_node(nodes, descendant, GraphDirection::Downstream);
        self.dirty_node(nodes, ancestor, GraphDirection::Upstream);
        Ok(())
    }

    /// Remove `descendant` from `ancestor`'s descendant set.
    pub fn disconnect_descendant<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        ancestor: NodeId,
        descendant: NodeId,
    ) -> Result<()> {
        ensure_live(nodes, descendant)?;
        nodes
            .get_mut(ancestor)
            .ok_or(GraphError::UnknownNode(ancestor))?
            .remove_descendant(descendant);

        self.reclassify(nodes, ancestor, descendant);
        self.dirty_node(nodes, descendant, GraphDirection::Downstream);
        self.dirty_node(nodes, ancestor, GraphDirection::Upstream);
        Ok(())
    }

    /// Record `ancestor` in `descendant`'s ancestor set.
    pub fn connect_ancestor<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        descendant: NodeId,
        ancestor: NodeId,
    ) -> Result<()> {
        ensure_live(nodes, ancestor)?;
        nodes
            .get_mut(descendant)
            .ok_or(GraphError::UnknownNode(descendant))?
            .insert_ancestor(ancestor);

        self.reclassify(nodes, ancestor, descendant);
        Ok(())
    }

    /// Remove `ancestor` from `descendant`'s ancestor set.
    pub fn disconnect_ancestor<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        descendant: NodeId,
        ancestor: NodeId,
    ) -> Result<()> {
        ensure_live(nodes, ancestor)?;
        nodes
            .get_mut(descendant)
            .ok_or(GraphError::UnknownNode(descendant))?
            .remove_ancestor(ancestor);

        self.reclassify(nodes, ancestor, descendant);
        Ok(())
    }

    /// Make `descendant`'s derived state depend on `ancestor`.
    ///
    /// Both nodes must be registered. Fails with [`GraphError::Cycle`] if
    /// `ancestor` is already reachable from `descendant` and the
    /// configuration rejects cycles.
    pub fn create_dependency<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        descendant: NodeId,
        ancestor: NodeId,
    ) -> Result<()> {
        self.ensure_registered(nodes, descendant)?;
        self.ensure_registered(nodes, ancestor)?;
        if descendant == ancestor {
            return Err(GraphError::SelfDependency(descendant));
        }
        if self.config().reject_cycles && self.reaches(nodes, descendant, ancestor) {
            tracing::warn!(?ancestor, ?descendant, "rejected cyclic dependency");
            return Err(GraphError::Cycle {
                ancestor,
                descendant,
            });
        }

        self.connect_descendant(nodes, ancestor, descendant)?;
        self.connect_ancestor(nodes, descendant, ancestor)
    }

    /// Remove the dependency of `descendant` on `ancestor`. Both nodes must
    /// be registered.
    pub fn remove_dependency<K>(
        &mut self,
        nodes: &mut NodeArena<K>,
        descendant: NodeId,
        ancestor: NodeId,
    ) -> Result<()> {
        self.ensure_registered(nodes, descendant)?;
        self.ensure_registered(nodes, ancestor)?;
        self.disconnect_descendant(nodes, ancestor, descendant)?;
        self.disconnect_ancestor(nodes, descendant, ancestor)
    }

    /// Check whether `to` is reachable from `from` along descendant edges.
    pub fn reaches<K>(&mut self, nodes: &mut NodeArena<K>, from: NodeId, to: NodeId) -> bool {
        let epoch = self.assign_visited_id(nodes);
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(from);

        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            if node.visited_id() == epoch {
                continue;
            }
            node.set_visited_id(epoch);
            stack.extend(node.descendants().iter().copied());
        }
        false
    }

    /// Fail unless `id` is live in the arena and registered with the graph.
    pub(crate) fn ensure_registered<K>(&self, nodes: &NodeArena<K>, id: NodeId) -> Result<()> {
        ensure_live(nodes, id)?;
        if self.contains(id) {
            Ok(())
        } else {
            Err(GraphError::NotRegistered(id))
        }
    }

    fn reclassify<K>(&mut self, nodes: &NodeArena<K>, a: NodeId, b: NodeId) {
        for id in [a, b] {
            if let Some(node) = nodes.get(id) {
                self.classify(node);
            }
        }
    }
}

fn ensure_live<K>(nodes: &NodeArena<K>, id: NodeId) -> Result<()> {
    if nodes.contains_key(id) {
        Ok(())
    } else {
        Err(GraphError::UnknownNode(id))
    }
}
