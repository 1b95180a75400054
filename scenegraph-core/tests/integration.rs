//! Integration Tests for the Scene Graph
//!
//! These tests drive a scene through the public API the way an editor does:
//! build a hierarchy, edit nodes, evaluate, and undo structural changes.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use scenegraph_core::{
    EvalContext, GraphConfig, GraphDirection, GraphError, GraphEvent, NodeClass, NodeId, Scene,
    SceneNode,
};

/// A transform-like payload: `world` is `local` plus the sum of the ancestors'
/// `world`, and `bounds` is one plus the sum of the descendants' `bounds`.
#[derive(Debug, Default)]
struct Accumulate {
    local: i32,
    world: i32,
    bounds: i32,
    downstream_runs: usize,
    upstream_runs: usize,
}

impl SceneNode for Accumulate {
    fn evaluate(&mut self, direction: GraphDirection, ctx: &EvalContext<'_, Self>) {
        match direction {
            GraphDirection::Downstream => {
                self.world = self.local + ctx.ancestors().map(|(_, a)| a.world).sum::<i32>();
                self.downstream_runs += 1;
            }
            GraphDirection::Upstream => {
                self.bounds = 1 + ctx.descendants().map(|(_, d)| d.bounds).sum::<i32>();
                self.upstream_runs += 1;
            }
        }
    }

    fn label(&self) -> &str {
        "accumulate"
    }
}

fn node(local: i32) -> Accumulate {
    Accumulate {
        local,
        ..Accumulate::default()
    }
}

/// Build the chain A -> B -> C and evaluate it once so every node is clean.
fn clean_chain() -> (Scene<Accumulate>, NodeId, NodeId, NodeId) {
    let mut scene = Scene::new();
    let a = scene.add(node(1));
    let b = scene.add(node(10));
    let c = scene.add(node(100));
    scene.create_dependency(b, a).unwrap();
    scene.create_dependency(c, b).unwrap();
    scene.evaluate(true);
    (scene, a, b, c)
}

/// Record the downstream order of every `Evaluated` event.
fn record_downstream(scene: &mut Scene<Accumulate>) -> Rc<RefCell<Vec<NodeId>>> {
    let order = Rc::new(RefCell::new(Vec::new()));
    let order_clone = order.clone();
    scene.subscribe(move |event| {
        if let GraphEvent::Evaluated(args) = event {
            order_clone.borrow_mut().extend(args.downstream.iter().copied());
        }
    });
    order
}

fn is_dirty(scene: &Scene<Accumulate>, id: NodeId) -> bool {
    scene.node(id).unwrap().is_dirty(GraphDirection::Downstream)
}

/// Check that every registered node is in exactly the class its edges imply.
fn assert_classification(scene: &Scene<Accumulate>) {
    let graph = scene.graph();
    for id in graph.nodes() {
        let node = scene.node(id).unwrap();
        let expected = NodeClass::of(!node.ancestors().is_empty(), !node.descendants().is_empty());
        assert_eq!(graph.class_of(id), Some(expected));

        let memberships = [
            graph.originals().contains(&id),
            graph.intermediates().contains(&id),
            graph.terminals().contains(&id),
        ];
        assert_eq!(memberships.iter().filter(|&&m| m).count(), 1);
    }
}

/// Dirtying the middle of a clean chain marks it and everything below.
#[test]
fn dirty_marks_node_and_descendants() {
    let (mut scene, a, b, c) = clean_chain();

    let marked = scene.dirty(b).unwrap();
    assert_eq!(marked, 2);
    assert!(!is_dirty(&scene, a));
    assert!(is_dirty(&scene, b));
    assert!(is_dirty(&scene, c));

    // Idempotent: a second call marks nothing new.
    assert_eq!(scene.dirty(b).unwrap(), 0);
    assert!(!is_dirty(&scene, a));
}

/// Evaluation after a local edit recomputes exactly the stale nodes, in order.
#[test]
fn evaluate_recomputes_stale_nodes_in_order() {
    let (mut scene, a, b, c) = clean_chain();
    let order = record_downstream(&mut scene);

    scene.dirty(b).unwrap();
    let result = scene.evaluate(false);

    assert_eq!(result.node_count, 2);
    assert_eq!(*order.borrow(), vec![b, c]);
    assert_eq!(scene.payload(a).unwrap().downstream_runs, 1);
    assert_eq!(scene.payload(b).unwrap().downstream_runs, 2);
    assert_eq!(scene.payload(c).unwrap().downstream_runs, 2);
    for id in [a, b, c] {
        assert!(!is_dirty(&scene, id));
    }
}

/// Derived values see fresh inputs.
#[test]
fn world_values_follow_local_edits() {
    let (mut scene, a, b, c) = clean_chain();
    assert_eq!(scene.payload(c).unwrap().world, 111);

    scene.modify(a, |n| n.local = 5).unwrap();
    scene.evaluate(true);

    assert_eq!(scene.payload(b).unwrap().world, 15);
    assert_eq!(scene.payload(c).unwrap().world, 115);
}

/// A shared ancestor of several terminals is evaluated once per pass.
#[test]
fn shared_ancestor_evaluates_once() {
    let mut scene = Scene::new();
    let root = scene.add(node(1));
    let leaves: Vec<_> = (0..5).map(|i| scene.add(node(i))).collect();
    for &leaf in &leaves {
        scene.create_dependency(leaf, root).unwrap();
    }

    scene.evaluate(true);
    assert_eq!(scene.payload(root).unwrap().downstream_runs, 1);
    for &leaf in &leaves {
        assert_eq!(scene.payload(leaf).unwrap().downstream_runs, 1);
        assert_eq!(scene.payload(leaf).unwrap().world, 1 + scene.payload(leaf).unwrap().local);
    }
}

/// Every prerequisite precedes its dependent in a diamond.
#[test]
fn diamond_respects_dependency_order() {
    let mut scene = Scene::new();
    let top = scene.add(node(1));
    let left = scene.add(node(2));
    let right = scene.add(node(3));
    let bottom = scene.add(node(4));
    scene.create_dependency(left, top).unwrap();
    scene.create_dependency(right, top).unwrap();
    scene.create_dependency(bottom, left).unwrap();
    scene.create_dependency(bottom, right).unwrap();
    let order = record_downstream(&mut scene);

    scene.evaluate(false);
    let order = order.borrow();
    let pos = |id| order.iter().position(|&n| n == id).unwrap();
    assert_eq!(order.len(), 4);
    assert!(pos(top) < pos(left));
    assert!(pos(top) < pos(right));
    assert!(pos(left) < pos(bottom));
    assert!(pos(right) < pos(bottom));
    // 4 + (2 + 1) + (3 + 1)
    assert_eq!(scene.payload(bottom).unwrap().world, 11);
}

/// Upstream state (bounds) aggregates descendants before ancestors.
#[test]
fn upstream_bounds_aggregate_children() {
    let (mut scene, a, b, c) = clean_chain();
    assert_eq!(scene.payload(a).unwrap().bounds, 3);

    let d = scene.add(node(0));
    scene.create_dependency(d, b).unwrap();
    scene.dirty_upstream(d).unwrap();
    scene.evaluate(true);

    assert_eq!(scene.payload(c).unwrap().bounds, 1);
    assert_eq!(scene.payload(b).unwrap().bounds, 3);
    assert_eq!(scene.payload(a).unwrap().bounds, 4);
}

/// A node connected below an existing chain is reached by later dirties.
#[test]
fn new_edge_is_reached_after_redirty() {
    let (mut scene, _a, b, c) = clean_chain();
    scene.dirty(b).unwrap();

    let d = scene.add(node(0));
    scene.evaluate(true);
    scene.create_dependency(d, c).unwrap();
    assert!(is_dirty(&scene, d));
    scene.evaluate(true);
    assert!(!is_dirty(&scene, d));

    scene.dirty(b).unwrap();
    assert!(is_dirty(&scene, d));
}

/// Classification tracks every edge change.
#[test]
fn classification_tracks_edges() {
    let (mut scene, a, b, c) = clean_chain();
    assert_classification(&scene);
    assert_eq!(scene.graph().class_of(a), Some(NodeClass::Original));
    assert_eq!(scene.graph().class_of(b), Some(NodeClass::Intermediate));
    assert_eq!(scene.graph().class_of(c), Some(NodeClass::Terminal));

    scene.remove_dependency(c, b).unwrap();
    assert_classification(&scene);
    assert_eq!(scene.graph().class_of(b), Some(NodeClass::Terminal));

    let lone = scene.add(node(0));
    assert_eq!(scene.graph().class_of(lone), Some(NodeClass::Terminal));
    assert_classification(&scene);
}

/// Prune then Insert restores the registered set and every edge.
#[test]
fn prune_insert_round_trip() {
    let (mut scene, a, b, c) = clean_chain();
    let x = scene.add(node(7));
    scene.create_dependency(c, x).unwrap();
    scene.evaluate(true);

    let registered: HashSet<NodeId> = scene.graph().nodes().collect();

    let mut pruned = Vec::new();
    scene.prune(b, &mut pruned).unwrap();
    assert_eq!(pruned.iter().copied().collect::<HashSet<_>>(), HashSet::from([b, c]));
    assert!(!scene.contains(b));
    assert!(!scene.contains(c));
    assert!(scene.node(a).unwrap().descendants().is_empty());
    assert!(scene.node(x).unwrap().descendants().is_empty());
    assert_classification(&scene);

    let mut inserted = Vec::new();
    scene.insert(b, &mut inserted).unwrap();
    assert_eq!(
        inserted.iter().copied().collect::<HashSet<_>>(),
        pruned.iter().copied().collect::<HashSet<_>>()
    );
    assert_eq!(scene.graph().nodes().collect::<HashSet<_>>(), registered);
    assert!(scene.node(a).unwrap().descendants().contains(&b));
    assert!(scene.node(x).unwrap().descendants().contains(&c));
    assert_classification(&scene);

    // Restored edges dirtied the branch; one pass brings it current.
    assert!(is_dirty(&scene, b));
    assert!(is_dirty(&scene, c));
    scene.evaluate(true);
    assert_eq!(scene.payload(c).unwrap().world, 100 + 11 + 7);
}

/// Pruned nodes are ignored by dirty propagation and evaluation.
#[test]
fn pruned_branch_is_not_evaluated() {
    let (mut scene, a, b, c) = clean_chain();
    let mut pruned = Vec::new();
    scene.prune(b, &mut pruned).unwrap();

    scene.dirty(a).unwrap();
    let result = scene.evaluate(true);
    // Only `a`, once in each direction: losing its child dirtied it upstream.
    assert_eq!(result.node_count, 2);
    assert_eq!(scene.payload(a).unwrap().downstream_runs, 2);
    assert_eq!(scene.payload(b).unwrap().downstream_runs, 1);
    assert_eq!(scene.payload(c).unwrap().downstream_runs, 1);
}

/// Graph events report registration and evaluation.
#[test]
fn events_report_changes() {
    let mut scene = Scene::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_clone = log.clone();
    let listener = scene.subscribe(move |event| log_clone.borrow_mut().push(event.clone()));

    let a = scene.add(node(1));
    scene.evaluate(false);
    let mut pruned = Vec::new();
    scene.prune(a, &mut pruned).unwrap();

    {
        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], GraphEvent::NodeAdded(a));
        assert!(matches!(&log[1], GraphEvent::Evaluated(args) if args.nodes().contains(&a)));
        assert_eq!(log[2], GraphEvent::NodeRemoved(a));
    }

    assert_eq!(scene.graph().listener_count(), 1);
    assert!(scene.unsubscribe(listener));
    assert_eq!(scene.graph().listener_count(), 0);
    scene.insert(a, &mut Vec::new()).unwrap();
    assert_eq!(log.borrow().len(), 3);
}

/// Statistics accumulate across passes until reset.
#[test]
fn statistics_accumulate() {
    let (mut scene, a, _b, _c) = clean_chain();
    assert_eq!(scene.statistics().passes, 1);
    assert_eq!(scene.statistics().node_count, 6);

    let result = scene.dirty_and_evaluate(a, true).unwrap();
    assert_eq!(result.node_count, 3);
    assert_eq!(scene.statistics().passes, 2);
    assert_eq!(scene.statistics().node_count, 9);

    scene.reset_statistics();
    assert_eq!(scene.statistics().passes, 0);
}

/// Cycles are refused unless the configuration allows them.
#[test]
fn cycle_policy_follows_config() {
    let (mut scene, a, _b, c) = clean_chain();
    assert!(matches!(
        scene.create_dependency(a, c),
        Err(GraphError::Cycle { .. })
    ));

    let config = GraphConfig::from_json(r#"{ "reject_cycles": false }"#).unwrap();
    let mut scene: Scene<Accumulate> = Scene::with_config(config);
    let a = scene.add(node(1));
    let b = scene.add(node(2));
    scene.create_dependency(b, a).unwrap();
    scene.create_dependency(a, b).unwrap();
    // Neither node is a root, so the pass has nothing to pull from.
    let result = scene.evaluate(true);
    assert_eq!(result.node_count, 0);
}

/// A pruned node cannot be edited or gain dependents until it is reinserted.
#[test]
fn pruned_node_rejects_new_dependents() {
    let mut scene = Scene::new();
    let a = scene.add(node(1));
    let b = scene.add(node(10));
    scene.create_dependency(b, a).unwrap();
    scene.evaluate(true);

    let mut pruned = Vec::new();
    scene.prune(b, &mut pruned).unwrap();

    let d = scene.add(node(0));
    assert!(matches!(
        scene.create_dependency(d, b),
        Err(GraphError::NotRegistered(id)) if id == b
    ));
    assert!(matches!(
        scene.modify(b, |n| n.local = 50),
        Err(GraphError::NotRegistered(_))
    ));
    assert_eq!(scene.payload(b).unwrap().local, 10);

    // Two nodes that were never registered cannot be linked either.
    let x = scene.spawn(node(0));
    let y = scene.spawn(node(0));
    assert!(matches!(
        scene.create_dependency(y, x),
        Err(GraphError::NotRegistered(_))
    ));

    // Once reinserted, the same edit and dependency go through.
    scene.insert(b, &mut Vec::new()).unwrap();
    scene.create_dependency(d, b).unwrap();
    scene.modify(b, |n| n.local = 50).unwrap();
    scene.evaluate(true);
    assert_eq!(scene.payload(d).unwrap().world, 51);
}

/// Reset empties the scene but keeps it usable.
#[test]
fn reset_starts_a_fresh_session() {
    let (mut scene, a, _b, _c) = clean_chain();
    scene.reset();
    assert!(scene.is_empty());
    assert!(scene.graph().is_empty());
    assert_eq!(scene.statistics().passes, 0);
    assert!(matches!(scene.dirty(a), Err(GraphError::UnknownNode(_))));

    let (p, q) = (scene.add(node(2)), scene.add(node(3)));
    scene.create_dependency(q, p).unwrap();
    scene.evaluate(true);
    assert_eq!(scene.payload(q).unwrap().world, 5);
}

/// Operations on a released handle report the stale handle.
#[test]
fn released_handle_is_unknown() {
    let (mut scene, _a, b, c) = clean_chain();
    let mut pruned = Vec::new();
    scene.prune(b, &mut pruned).unwrap();

    let payload = scene.release(c).unwrap();
    assert_eq!(payload.local, 100);
    assert!(scene.node(b).unwrap().descendants().is_empty());
    assert!(matches!(scene.dirty(c), Err(GraphError::UnknownNode(id)) if id == c));
    assert!(matches!(
        scene.insert(c, &mut Vec::new()),
        Err(GraphError::UnknownNode(_))
    ));
}
