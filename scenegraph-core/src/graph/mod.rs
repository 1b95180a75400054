//! Dependency Graph
//!
//! This module implements the scene dependency graph: which pieces of derived
//! scene state (world transforms, bounds, tessellated curves, skin matrices)
//! depend on which others.
//!
//! # Overview
//!
//! The graph is a directed graph, acyclic by convention, where:
//!
//! - Nodes are scene objects whose payload caches derived state
//! - An edge `ancestor -> descendant` means the descendant's derived state is
//!   computed from the ancestor's
//!
//! Editing a node marks it dirty and floods the mark to its dependents. A
//! later evaluation pass recomputes exactly the dirty subset, ancestors
//! first, and reports which nodes changed.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a `slotmap` arena owned by the [`Scene`](crate::Scene).
//!    Edges are sets of handles stored in both endpoints, so local traversal
//!    is O(1) per edge and no reference can dangle.
//!
//! 2. The [`Graph`] only tracks classification (Original / Intermediate /
//!    Terminal) and a visited-epoch counter. Comparing a node's stamp with the
//!    current epoch replaces clearing a visited flag on every node.
//!
//! 3. All traversals use explicit stacks instead of recursion.

mod edges;
mod evaluate;
mod events;
mod node;
mod registry;
mod surgery;

pub use evaluate::EvaluateResult;
pub use events::{EvaluatedArgs, GraphEvent, ListenerId};
pub use node::{EvalContext, GraphDirection, Node, NodeArena, NodeId, NodeState, SceneNode};
pub use registry::{Graph, NodeClass};
