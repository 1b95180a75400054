//! Scenegraph Core
//!
//! This crate provides the dependency graph that keeps a scene's derived state
//! (world transforms, bounds, skinning, ...) consistent with its authored
//! state. It implements:
//!
//! - Node adjacency with `Original` / `Intermediate` / `Terminal` classification
//! - Dirty propagation in both graph directions
//! - Pull-based evaluation that recomputes each stale node once, inputs first
//! - Prune / Insert surgery for structural undo and redo
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: node storage, classification, dirtiness, evaluation and surgery
//! - `config`: per-session tunables, loadable from JSON
//! - `error`: the crate's error type
//!
//! [`Scene`] ties an arena of nodes to a [`Graph`] and is the usual entry
//! point.
//!
//! # Example
//!
//! ```rust
//! use scenegraph_core::{EvalContext, GraphDirection, Scene, SceneNode};
//!
//! struct Offset {
//!     local: i32,
//!     world: i32,
//! }
//!
//! impl SceneNode for Offset {
//!     fn evaluate(&mut self, direction: GraphDirection, ctx: &EvalContext<'_, Self>) {
//!         if direction == GraphDirection::Downstream {
//!             let parent: i32 = ctx.ancestors().map(|(_, a)| a.world).sum();
//!             self.world = self.local + parent;
//!         }
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! let parent = scene.add(Offset { local: 2, world: 0 });
//! let child = scene.add(Offset { local: 3, world: 0 });
//! scene.create_dependency(child, parent).unwrap();
//!
//! scene.evaluate(false);
//! assert_eq!(scene.payload(child).unwrap().world, 5);
//! ```

pub mod config;
pub mod error;
pub mod graph;
mod scene;

pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use graph::{
    EvalContext, EvaluateResult, EvaluatedArgs, Graph, GraphDirection, GraphEvent, ListenerId,
    Node, NodeArena, NodeClass, NodeId, NodeState, SceneNode,
};
pub use scene::{Scene, Statistics};
