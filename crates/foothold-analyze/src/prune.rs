//! Post-expansion prune pipeline.
//!
//! Sequential pure transformations on the working graph: trim the outer
//! layer to the last-tier policies (to fixpoint), prune outermost layers
//! down to the node budget, drop islands, mark the surviving boundary.

use std::collections::{HashMap, HashSet};

use foothold_core::{Direction, EdgeBitmap, ObjectId, ObjectType, ProgressEvent, ProgressSink};
use foothold_store::{NodeFilter, ObjectStore};
use tracing::{debug, warn};

use crate::engine::NodeState;
use crate::graph::AnalysisGraph;

/// The last-tier acceptance policy applied to outer nodes.
pub(crate) struct TrimPolicy<'a> {
    pub edges_last: EdgeBitmap,
    pub object_types_last: &'a HashSet<ObjectType>,
    pub filter_last: Option<&'a dyn NodeFilter>,
    pub direction: Direction,
}

/// The current outer layer: nodes nothing points at (direction `In`) or
/// nodes pointing at nothing (direction `Out`).
fn outer_nodes(graph: &AnalysisGraph, direction: Direction) -> Vec<ObjectId> {
    match direction {
        Direction::In => graph.starting_nodes(),
        Direction::Out => graph.ending_nodes(),
    }
}

/// Delete outer nodes the last-tier policy rejects, repeating until a pass
/// removes nothing: deleting an outer node can expose new outer nodes.
pub(crate) fn trim_outer(
    graph: &mut AnalysisGraph,
    store: &ObjectStore,
    policy: &TrimPolicy<'_>,
    progress: &dyn ProgressSink,
) {
    progress.event(ProgressEvent::Begin {
        task: "Removing filtered nodes",
        total: graph.order() as i64,
    });

    loop {
        let outer: HashSet<ObjectId> = outer_nodes(graph, policy.direction).into_iter().collect();
        let mut removed = 0usize;

        for (source, target, label) in graph.edges() {
            let end = match policy.direction {
                Direction::In => source,
                Direction::Out => target,
            };
            if !outer.contains(&end) || !graph.has_node(end) {
                continue;
            }

            if label.intersect(policy.edges_last).is_blank() {
                graph.delete_node(end);
                progress.event(ProgressEvent::Advance { steps: 1 });
                removed += 1;
                continue;
            }

            let object = store.object(end);
            if !policy.object_types_last.is_empty()
                && !policy.object_types_last.contains(&object.object_type)
            {
                debug!(object = %object.name, object_type = ?object.object_type,
                    "Removing outer node not in the last-tier type set");
                graph.delete_node(end);
                progress.event(ProgressEvent::Advance { steps: 1 });
                removed += 1;
                continue;
            }

            if let Some(filter) = policy.filter_last {
                if !filter.evaluate(object) {
                    graph.delete_node(end);
                    progress.event(ProgressEvent::Advance { steps: 1 });
                    removed += 1;
                }
            }
        }

        if removed == 0 {
            break;
        }
        debug!(removed, "Outer-node filter pass removed nodes");
    }

    progress.event(ProgressEvent::End);
}

/// Drop outermost (highest-round) outer nodes until the graph fits the node
/// budget. Keeps the shortest, most probable paths; not a top-K guarantee.
pub(crate) fn enforce_node_limit(
    graph: &mut AnalysisGraph,
    state: &HashMap<ObjectId, NodeState>,
    node_limit: usize,
    direction: Direction,
    progress: &dyn ProgressSink,
) {
    if node_limit == 0 || graph.order() <= node_limit {
        return;
    }
    let mut left_to_remove = graph.order() - node_limit;
    progress.event(ProgressEvent::Begin {
        task: "Removing random excessive outer nodes",
        total: left_to_remove as i64,
    });

    while left_to_remove > 0 {
        let outer = outer_nodes(graph, direction);
        let round_of = |id: &ObjectId| state.get(id).map_or(0, |s| s.process_round);
        let max_round = outer.iter().map(round_of).max().unwrap_or(0);

        let mut removed_this_round = 0usize;
        for id in &outer {
            if round_of(id) == max_round {
                graph.delete_node(*id);
                progress.event(ProgressEvent::Advance { steps: 1 });
                left_to_remove -= 1;
                removed_this_round += 1;
            }
            if left_to_remove == 0 {
                break;
            }
        }

        if removed_this_round == 0 && left_to_remove > 0 {
            warn!(
                remaining = left_to_remove,
                "Could not find any outer nodes to remove"
            );
            break;
        }
    }

    progress.event(ProgressEvent::End);
}

/// Remove every node with no incident edges.
pub(crate) fn prune_islands(graph: &mut AnalysisGraph) {
    let islands = graph.islands();
    let pruned = islands.len();
    for id in islands {
        graph.delete_node(id);
    }
    if pruned > 0 {
        debug!(pruned, nodes = graph.order(), "Pruned island nodes");
    }
}

/// Mark the final outer layer as the attack sources.
pub(crate) fn mark_sources(graph: &mut AnalysisGraph, direction: Direction) {
    for id in outer_nodes(graph, direction) {
        graph.set_node_data(id, "source", true.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foothold_core::{EdgeRegistry, NullProgress, Object};

    fn chain_store() -> (ObjectStore, EdgeRegistry) {
        let mut registry = EdgeRegistry::new();
        registry.register("MemberOfGroup").unwrap();
        registry.register("WriteDacl").unwrap();
        let mut store = ObjectStore::new();
        for name in ["a", "b", "c"] {
            store.insert(Object::new(name, ObjectType::User));
        }
        (store, registry)
    }

    #[test]
    fn test_trim_cascades_to_fixpoint() {
        let (store, registry) = chain_store();
        let member = registry.kind("MemberOfGroup").unwrap();
        let dacl = registry.kind("WriteDacl").unwrap();

        // a -> b (WriteDacl), b -> c (MemberOfGroup); only MemberOfGroup
        // passes the last tier, so a goes, then b becomes outer and goes too.
        let mut graph = AnalysisGraph::new();
        graph.add_edge(ObjectId(0), ObjectId(1), EdgeBitmap::single(dacl));
        graph.add_edge(ObjectId(1), ObjectId(2), EdgeBitmap::single(member));

        trim_outer(
            &mut graph,
            &store,
            &TrimPolicy {
                edges_last: EdgeBitmap::single(member),
                object_types_last: &HashSet::new(),
                filter_last: None,
                direction: Direction::In,
            },
            &NullProgress,
        );

        assert_eq!(graph.order(), 1);
        assert!(graph.has_node(ObjectId(2)));
    }

    #[test]
    fn test_trim_keeps_conforming_outer_nodes() {
        let (store, registry) = chain_store();
        let member = registry.kind("MemberOfGroup").unwrap();

        let mut graph = AnalysisGraph::new();
        graph.add_edge(ObjectId(0), ObjectId(1), EdgeBitmap::single(member));

        trim_outer(
            &mut graph,
            &store,
            &TrimPolicy {
                edges_last: EdgeBitmap::single(member),
                object_types_last: &HashSet::new(),
                filter_last: None,
                direction: Direction::In,
            },
            &NullProgress,
        );

        assert_eq!(graph.order(), 2);
    }

    #[test]
    fn test_trim_applies_last_filter() {
        let (store, registry) = chain_store();
        let member = registry.kind("MemberOfGroup").unwrap();

        let mut graph = AnalysisGraph::new();
        graph.add_edge(ObjectId(0), ObjectId(1), EdgeBitmap::single(member));

        let reject_a = |o: &Object| o.name != "a";
        trim_outer(
            &mut graph,
            &store,
            &TrimPolicy {
                edges_last: EdgeBitmap::single(member),
                object_types_last: &HashSet::new(),
                filter_last: Some(&reject_a),
                direction: Direction::In,
            },
            &NullProgress,
        );

        assert!(!graph.has_node(ObjectId(0)));
        assert!(graph.has_node(ObjectId(1)));
    }

    #[test]
    fn test_node_limit_drops_outermost_rounds_first() {
        let (_, registry) = chain_store();
        let member = registry.kind("MemberOfGroup").unwrap();
        let bitmap = EdgeBitmap::single(member);

        // Fan-in tree toward node 0: two at round 2, two at round 3.
        let mut graph = AnalysisGraph::new();
        graph.add_edge(ObjectId(1), ObjectId(0), bitmap);
        graph.add_edge(ObjectId(2), ObjectId(0), bitmap);
        graph.add_edge(ObjectId(3), ObjectId(1), bitmap);
        graph.add_edge(ObjectId(4), ObjectId(2), bitmap);

        let mut state = HashMap::new();
        let node_state = |round| NodeState {
            process_round: round,
            accumulated_probability: 1.0,
            can_expand: 0,
        };
        state.insert(ObjectId(0), node_state(1));
        state.insert(ObjectId(1), node_state(2));
        state.insert(ObjectId(2), node_state(2));
        state.insert(ObjectId(3), node_state(3));
        state.insert(ObjectId(4), node_state(3));

        enforce_node_limit(&mut graph, &state, 3, Direction::In, &NullProgress);

        assert_eq!(graph.order(), 3);
        assert!(!graph.has_node(ObjectId(3)));
        assert!(!graph.has_node(ObjectId(4)));
        assert!(graph.has_node(ObjectId(0)));
    }

    #[test]
    fn test_node_limit_noop_when_under_budget() {
        let (_, registry) = chain_store();
        let member = registry.kind("MemberOfGroup").unwrap();
        let mut graph = AnalysisGraph::new();
        graph.add_edge(ObjectId(0), ObjectId(1), EdgeBitmap::single(member));

        enforce_node_limit(&mut graph, &HashMap::new(), 10, Direction::In, &NullProgress);
        assert_eq!(graph.order(), 2);

        // 0 means unlimited.
        enforce_node_limit(&mut graph, &HashMap::new(), 0, Direction::In, &NullProgress);
        assert_eq!(graph.order(), 2);
    }

    #[test]
    fn test_prune_islands_removes_degree_zero_only() {
        let (_, registry) = chain_store();
        let member = registry.kind("MemberOfGroup").unwrap();

        let mut graph = AnalysisGraph::new();
        graph.add_edge(ObjectId(0), ObjectId(1), EdgeBitmap::single(member));
        graph.add_node(ObjectId(5));
        graph.add_node(ObjectId(6));

        prune_islands(&mut graph);
        assert_eq!(graph.order(), 2);
        assert!(graph.has_node(ObjectId(0)));
        assert!(!graph.has_node(ObjectId(5)));
    }

    #[test]
    fn test_mark_sources_follows_direction() {
        let (_, registry) = chain_store();
        let member = registry.kind("MemberOfGroup").unwrap();
        let mut graph = AnalysisGraph::new();
        graph.add_edge(ObjectId(0), ObjectId(1), EdgeBitmap::single(member));

        mark_sources(&mut graph, Direction::In);
        assert_eq!(graph.node_data(ObjectId(0), "source"), Some(&true.into()));
        assert_eq!(graph.node_data(ObjectId(1), "source"), None);

        mark_sources(&mut graph, Direction::Out);
        assert_eq!(graph.node_data(ObjectId(1), "source"), Some(&true.into()));
    }
}
