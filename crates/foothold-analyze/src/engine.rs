//! The attack-path expansion engine.
//!
//! Round-based bounded BFS over the store's typed-edge graph. Round 1 seeds
//! the graph with every object the first-tier filter accepts; each following
//! round expands the newest layer through the middle-tier edge/type policies,
//! gating on per-edge and accumulated probability, the backlink window, and
//! the outgoing degree cap. The post-expansion prune pipeline then trims the
//! outer layer to the last-tier policies, enforces the node budget, drops
//! islands, and marks the surviving boundary.

use std::cmp::Reverse;
use std::collections::HashMap;

use foothold_core::{
    Direction, EdgeBitmap, EdgeRegistry, NullProgress, Object, ObjectId, ProgressEvent,
    ProgressSink, Sid,
};
use foothold_store::ObjectStore;
use tracing::{debug, info, warn};

use crate::graph::AnalysisGraph;
use crate::options::AnalyzeOptions;
use crate::prune::{self, TrimPolicy};

static NO_PROGRESS: NullProgress = NullProgress;

/// Discovery bookkeeping for one explored node.
///
/// Earliest discovery wins: once created, a state is never overwritten, so
/// `accumulated_probability` always describes the first path that reached
/// the node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeState {
    /// Round in which the node is due for expansion (1 for seeds).
    pub process_round: u32,
    /// Product of edge max-probabilities along the discovery path, in [0, 1].
    pub accumulated_probability: f32,
    /// Outgoing candidates suppressed by the degree cap (0 if not capped).
    pub can_expand: usize,
}

/// What an analysis returns.
#[derive(Debug)]
pub struct AnalysisResults {
    pub graph: AnalysisGraph,
    /// Nodes dropped after the outer-layer trim (node budget + islands).
    pub removed: usize,
}

/// One candidate edge collected while expanding a node, held back until the
/// node's full candidate set is known so the degree cap can see all of it.
struct Candidate {
    source: ObjectId,
    target: ObjectId,
    /// The far endpoint (the newly reached object).
    far: ObjectId,
    detected: EdgeBitmap,
}

/// The analysis engine: borrows a quiescent store and its edge registry,
/// produces a fresh [`AnalysisGraph`] per call.
pub struct AnalysisEngine<'a> {
    store: &'a ObjectStore,
    registry: &'a EdgeRegistry,
    progress: &'a dyn ProgressSink,
}

impl<'a> AnalysisEngine<'a> {
    pub fn new(store: &'a ObjectStore, registry: &'a EdgeRegistry) -> Self {
        Self {
            store,
            registry,
            progress: &NO_PROGRESS,
        }
    }

    /// Report begin/advance/end events to `sink` during analysis.
    pub fn with_progress(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.progress = sink;
        self
    }

    /// Run one analysis. Total over every option combination: the result may
    /// be empty, but it is always a graph.
    pub fn analyze(&self, opts: &AnalyzeOptions) -> AnalysisResults {
        let mut graph = AnalysisGraph::new();
        let mut state: HashMap<ObjectId, NodeState> = HashMap::new();

        // With no edge policy at all, every tier sees the full universe.
        let universe_default = opts.edges_first.is_blank()
            && opts.edges_middle.is_blank()
            && opts.edges_last.is_blank();
        let universe = self.registry.universe();
        let edges_first = if universe_default { universe } else { opts.edges_first };
        let edges_middle = if universe_default { universe } else { opts.edges_middle };
        let edges_last = if universe_default { universe } else { opts.edges_last };

        self.seed(&mut graph, &mut state, opts);
        self.expand(&mut graph, &mut state, opts, edges_first, edges_middle);

        if state.len() != graph.order() {
            warn!(
                nodes = graph.order(),
                tracked = state.len(),
                "Node state and graph order diverged"
            );
        }

        prune::trim_outer(
            &mut graph,
            self.store,
            &TrimPolicy {
                edges_last,
                object_types_last: &opts.object_types_last,
                filter_last: opts.filter_last.as_deref(),
                direction: opts.direction,
            },
            self.progress,
        );

        let total_after_trim = graph.order();
        debug!(nodes = total_after_trim, "Outer-layer trim complete");

        prune::enforce_node_limit(
            &mut graph,
            &state,
            opts.node_limit,
            opts.direction,
            self.progress,
        );

        if opts.prune_islands {
            prune::prune_islands(&mut graph);
        }

        prune::mark_sources(&mut graph, opts.direction);

        for (id, node_state) in &state {
            if node_state.can_expand > 0 && graph.has_node(*id) {
                graph.set_node_data(*id, "canexpand", node_state.can_expand.into());
            }
        }

        info!(nodes = graph.order(), "Graph query complete");

        AnalysisResults {
            removed: total_after_trim - graph.order(),
            graph,
        }
    }

    /// Round 1 seeding: every object the first-tier filter accepts becomes a
    /// target node with full accumulated probability.
    fn seed(
        &self,
        graph: &mut AnalysisGraph,
        state: &mut HashMap<ObjectId, NodeState>,
        opts: &AnalyzeOptions,
    ) {
        for (id, object) in self.store.objects() {
            let accepted = match &opts.filter_first {
                Some(filter) => filter.evaluate(object),
                None => true,
            };
            if !accepted {
                continue;
            }
            graph.set_node_data(id, "target", true.into());
            state.entry(id).or_insert(NodeState {
                process_round: 1,
                accumulated_probability: 1.0,
                can_expand: 0,
            });
        }
        debug!(targets = graph.order(), "Seeded analysis graph");
    }

    fn expand(
        &self,
        graph: &mut AnalysisGraph,
        state: &mut HashMap<ObjectId, NodeState>,
        opts: &AnalyzeOptions,
        edges_first: EdgeBitmap,
        edges_middle: EdgeBitmap,
    ) {
        let everyone = Sid::everyone();
        let authenticated_users = Sid::authenticated_users();

        self.progress.event(ProgressEvent::Begin {
            task: "Analyzing graph",
            total: i64::from(opts.max_depth),
        });

        let unbounded = opts.max_depth == -1;
        let mut round: u32 = 1;
        while unbounded || (opts.max_depth >= 0 && round <= opts.max_depth as u32) {
            self.progress.event(ProgressEvent::Advance { steps: 1 });

            let (active_edges, active_types) = if round == 1 {
                (edges_first, &opts.object_types_first)
            } else {
                (edges_middle, &opts.object_types_middle)
            };

            debug!(
                round,
                nodes = graph.order(),
                connections = graph.size(),
                "Starting expansion round"
            );
            let nodes_at_start = graph.order();

            for node in graph.node_ids() {
                let Some(current_state) = state.get(&node).copied() else {
                    continue;
                };
                if current_state.process_round != round {
                    continue;
                }

                let current = self.store.object(node);

                // The Everyone / Authenticated Users pseudo-principals are
                // predecessors of nearly everything; expanding them explodes
                // the graph without adding paths an attacker cares about.
                if opts.direction == Direction::In && opts.dont_expand_aueo {
                    if let Some(sid) = current.sid() {
                        if *sid == everyone || *sid == authenticated_users {
                            continue;
                        }
                    }
                }

                let mut candidates: Vec<Candidate> = Vec::new();

                for (next, bitmap) in self.store.edges(node, opts.direction) {
                    let detected = bitmap.intersect(active_edges);
                    if detected.is_blank() {
                        // Nothing permitted, or just a deny ACL.
                        continue;
                    }

                    let next_object = self.store.object(next);
                    if !active_types.is_empty() && !active_types.contains(&next_object.object_type)
                    {
                        continue;
                    }

                    let (source, target) = match opts.direction {
                        Direction::In => (next, node),
                        Direction::Out => (node, next),
                    };
                    let max_probability = detected.max_probability(
                        self.registry,
                        self.store.object(source),
                        self.store.object(target),
                    );
                    if max_probability < opts.min_edge_probability {
                        continue;
                    }

                    let accumulated = current_state.accumulated_probability
                        * f32::from(max_probability)
                        / 100.0;
                    if accumulated < f32::from(opts.min_accumulated_probability) / 100.0 {
                        continue;
                    }

                    // Already-known nodes are only re-targeted within the
                    // backlink window. Objects sharing one domain-account SID
                    // are the same principal seen across domains and always
                    // stay traversable.
                    if graph.has_node(next)
                        && round > 1
                        && state
                            .get(&next)
                            .is_some_and(|s| s.process_round + opts.backlinks <= round)
                        && !cross_domain_replica(current, next_object)
                    {
                        continue;
                    }

                    if let Some(filter) = &opts.filter_middle {
                        if !filter.evaluate(next_object) {
                            continue;
                        }
                    }

                    candidates.push(Candidate {
                        source,
                        target,
                        far: next,
                        detected,
                    });

                    state.entry(next).or_insert(NodeState {
                        process_round: round + 1,
                        accumulated_probability: accumulated,
                        can_expand: 0,
                    });
                }

                let suppressed = self.commit(graph, opts, node, candidates);
                if suppressed > 0 {
                    if let Some(s) = state.get_mut(&node) {
                        s.can_expand = suppressed;
                    }
                }
            }

            debug!(
                round,
                added = graph.order() - nodes_at_start,
                "Expansion round complete"
            );
            if graph.order() == nodes_at_start {
                break;
            }
            round += 1;
        }

        self.progress.event(ProgressEvent::End);
    }

    /// Commit a node's candidate edges, applying the degree cap. Returns the
    /// number of suppressed candidates.
    ///
    /// Under the cap, group-membership edges are committed first when they
    /// all fit (they are cheap and structural); the remainder is committed in
    /// descending `sort_by`-attribute order of the far endpoint, or iteration
    /// order without a sort attribute, until the cap is reached.
    fn commit(
        &self,
        graph: &mut AnalysisGraph,
        opts: &AnalyzeOptions,
        node: ObjectId,
        candidates: Vec<Candidate>,
    ) -> usize {
        if opts.max_outgoing_connections < 0
            || candidates.len() < opts.max_outgoing_connections as usize
        {
            for c in candidates {
                graph.add_edge(c.source, c.target, c.detected);
            }
            return 0;
        }

        let cap = opts.max_outgoing_connections as usize;
        let total = candidates.len();
        debug!(
            object = %self.store.object(node).name,
            candidates = total,
            cap,
            "Outgoing expansion limit hit"
        );

        let mut committed = 0usize;
        let mut rest: Vec<Candidate>;
        match opts.group_priority_kind {
            Some(group)
                if candidates.iter().filter(|c| c.detected.is_set(group)).count() < cap =>
            {
                rest = Vec::with_capacity(total);
                for c in candidates {
                    if c.detected.is_set(group) {
                        graph.add_edge(c.source, c.target, c.detected);
                        committed += 1;
                    } else {
                        rest.push(c);
                    }
                }
                debug!(committed, cap, "Committed group edges under the expansion limit");
            }
            _ => rest = candidates,
        }

        if let Some(attr) = &opts.sort_by {
            rest.sort_by_key(|c| Reverse(self.store.object(c.far).attr_int(attr).unwrap_or(0)));
        }

        for c in &rest {
            if committed >= cap {
                break;
            }
            graph.add_edge(c.source, c.target, c.detected);
            committed += 1;
        }

        total - committed
    }
}

/// Two objects carrying the same non-null domain-account SID are one
/// principal replicated across domains.
fn cross_domain_replica(a: &Object, b: &Object) -> bool {
    match (a.sid(), b.sid()) {
        (Some(x), Some(y)) => x.is_domain_account() && x == y,
        _ => false,
    }
}
