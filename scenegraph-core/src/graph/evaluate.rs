//! Evaluation Pass
//!
//! The pass brings every reachable dirty node clean, prerequisites first.
//!
//! # Algorithm
//!
//! Evaluation is pull-based:
//!
//! 1. Downstream: every dirty `Terminal` node is a root. Before a node is
//!    evaluated, each of its dirty ancestors is evaluated.
//! 2. Upstream: every dirty node without ancestors is a root. Before a node
//!    is evaluated, each of its dirty descendants is evaluated.
//!
//! The walk is an explicit post-order stack, so deep hierarchies cannot
//! overflow the call stack. Each pass takes a fresh epoch and stamps nodes as
//! they are expanded; a stamped node is never expanded twice in the same
//! pass, which evaluates shared ancestors once and keeps the walk finite even
//! if the graph was made cyclic.

use std::time::{Duration, Instant};

use serde::Serialize;
use smallvec::SmallVec;

use super::events::{EvaluatedArgs, GraphEvent};
use super::node::{GraphDirection, Node, NodeArena, NodeId, SceneNode};
use super::registry::Graph;

/// Outcome of one [`Graph::evaluate_graph`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluateResult {
    /// Wall time spent in the pass.
    pub total_time: Duration,
    /// Number of evaluations performed, both directions combined.
    pub node_count: usize,
}

#[derive(Clone, Copy)]
enum Visit {
    Expand(NodeId),
    Evaluate(NodeId),
}

impl Graph {
    /// Evaluate every dirty node reachable from the graph's roots.
    ///
    /// Unless `silent`, fires [`GraphEvent::Evaluated`] with the nodes that
    /// were recomputed.
    pub fn evaluate_graph<K: SceneNode>(
        &mut self,
        nodes: &mut NodeArena<K>,
        silent: bool,
    ) -> EvaluateResult {
        let start = Instant::now();

        let mut args = EvaluatedArgs::default();
        for direction in GraphDirection::ALL {
            let roots = self.roots(nodes, direction);
            let evaluated = self.evaluate_pass(nodes, roots, direction);
            match direction {
                GraphDirection::Downstream => args.downstream = evaluated,
                GraphDirection::Upstream => args.upstream = evaluated,
            }
        }

        let result = EvaluateResult {
            total_time: start.elapsed(),
            node_count: args.len(),
        };

        tracing::debug!(
            nodes = result.node_count,
            elapsed_us = result.total_time.as_micros() as u64,
            "evaluated graph"
        );
        if let Some(limit) = self.config().slow_pass_warning_ms {
            if result.total_time > Duration::from_millis(limit) {
                tracing::warn!(
                    nodes = result.node_count,
                    elapsed_ms = result.total_time.as_millis() as u64,
                    limit_ms = limit,
                    "slow evaluation pass"
                );
            }
        }

        if !silent && (!args.is_empty() || self.config().notify_empty_passes) {
            self.emit(&GraphEvent::Evaluated(args));
        }

        result
    }

    /// Dirty nodes a pass in `direction` starts from: sinks for Downstream,
    /// sources (including unconnected nodes) for Upstream.
    fn roots<K>(&self, nodes: &NodeArena<K>, direction: GraphDirection) -> Vec<NodeId> {
        let dirty = |id: &NodeId| nodes.get(*id).is_some_and(|n| n.is_dirty(direction));
        match direction {
            GraphDirection::Downstream => self.terminals().iter().copied().filter(dirty).collect(),
            GraphDirection::Upstream => self
                .originals()
                .iter()
                .chain(self.terminals().iter())
                .copied()
                .filter(|id| nodes.get(*id).is_some_and(|n| n.ancestors().is_empty()))
                .filter(dirty)
                .collect(),
        }
    }

    /// Evaluate every dirty node reachable from `roots` in `direction`,
    /// returning them in evaluation order.
    fn evaluate_pass<K: SceneNode>(
        &mut self,
        nodes: &mut NodeArena<K>,
        roots: Vec<NodeId>,
        direction: GraphDirection,
    ) -> Vec<NodeId> {
        let mut evaluated = Vec::new();
        if roots.is_empty() {
            return evaluated;
        }

        let epoch = self.assign_visited_id(nodes);
        let mut stack: SmallVec<[Visit; 32]> = SmallVec::new();

        for root in roots {
            stack.push(Visit::Expand(root));

            while let Some(visit) = stack.pop() {
                match visit {
                    Visit::Evaluate(id) => {
                        Node::do_evaluate(nodes, id, direction);
                        evaluated.push(id);
                    }
                    Visit::Expand(id) => {
                        let Some(node) = nodes.get_mut(id) else {
                            continue;
                        };
                        if node.visited_id() == epoch || !node.is_dirty(direction) {
                            continue;
                        }
                        node.set_visited_id(epoch);
                        stack.push(Visit::Evaluate(id));

                        // Reversed so the first recorded prerequisite evaluates first.
                        for &prerequisite in node.prerequisites(direction).iter().rev() {
                            if self.contains(prerequisite) {
                                stack.push(Visit::Expand(prerequisite));
                            } else {
                                tracing::trace!(?id, ?prerequisite, "skipping unregistered prerequisite");
                            }
                        }
                    }
                }
            }
        }

        evaluated
    }
}
