//! Error types for scenegraph-core.
//!
//! The graph is an in-process structure with a single trusted mutator, so
//! these are programmer errors: stale handles, double registration, edges
//! that would break acyclicity. Evaluation itself never fails.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors that can occur during graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The handle does not refer to a live node in the scene arena.
    #[error("unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// A node was asked to depend on itself.
    #[error("node {0:?} cannot depend on itself")]
    SelfDependency(NodeId),

    /// Creating the dependency would close a cycle.
    #[error("dependency {ancestor:?} -> {descendant:?} would create a cycle")]
    Cycle {
        /// The node that would become the ancestor.
        ancestor: NodeId,
        /// The node that would become the descendant.
        descendant: NodeId,
    },

    /// The node is already registered with the graph.
    #[error("node {0:?} is already registered with the graph")]
    AlreadyRegistered(NodeId),

    /// The node is not registered with the graph.
    #[error("node {0:?} is not registered with the graph")]
    NotRegistered(NodeId),

    /// The node must be unregistered before this operation.
    #[error("node {0:?} is still registered with the graph")]
    StillRegistered(NodeId),

    /// The graph configuration could not be parsed.
    #[error("invalid graph config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
