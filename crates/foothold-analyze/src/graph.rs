//! The working graph an analysis builds up and prunes down.
//!
//! A labeled multidigraph over [`ObjectId`] handles: at most one edge per
//! ordered pair, labeled with the union [`EdgeBitmap`] of all permitted kinds
//! between the pair. Nodes carry an open string-keyed data map (the engine
//! uses the `"target"`, `"source"` and `"canexpand"` keys). Deleting a node
//! purges its data and every incident edge.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use foothold_core::{Direction, EdgeBitmap, ObjectId};

#[derive(Debug, Default)]
struct NodeEntry {
    outgoing: HashMap<ObjectId, EdgeBitmap>,
    incoming: HashMap<ObjectId, EdgeBitmap>,
    data: HashMap<String, serde_json::Value>,
}

/// Mutable analysis graph, owned by the engine during a run and handed to
/// the caller on return.
#[derive(Debug, Default)]
pub struct AnalysisGraph {
    nodes: HashMap<ObjectId, NodeEntry>,
    edge_count: usize,
}

impl AnalysisGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: ObjectId) {
        self.nodes.entry(id).or_default();
    }

    pub fn has_node(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Remove `id`, its data, and all incident edges in both directions.
    pub fn delete_node(&mut self, id: ObjectId) {
        let Some(entry) = self.nodes.remove(&id) else {
            return;
        };
        self.edge_count -= entry.outgoing.len();
        for target in entry.outgoing.keys() {
            if let Some(other) = self.nodes.get_mut(target) {
                other.incoming.remove(&id);
            }
        }
        for source in entry.incoming.keys() {
            if *source == id {
                continue; // self-loop, already counted with outgoing
            }
            self.edge_count -= 1;
            if let Some(other) = self.nodes.get_mut(source) {
                other.outgoing.remove(&id);
            }
        }
    }

    /// Add an edge, unioning `kinds` into any existing label. Endpoints are
    /// created when absent.
    pub fn add_edge(&mut self, source: ObjectId, target: ObjectId, kinds: EdgeBitmap) {
        self.add_node(target);
        match self.nodes.entry(source).or_default().outgoing.entry(target) {
            Entry::Vacant(slot) => {
                slot.insert(kinds);
                self.edge_count += 1;
            }
            Entry::Occupied(mut slot) => {
                let merged = slot.get().union(kinds);
                slot.insert(merged);
            }
        }
        if let Some(entry) = self.nodes.get_mut(&target) {
            let mirror = entry.incoming.entry(source).or_default();
            *mirror = mirror.union(kinds);
        }
    }

    pub fn edge(&self, source: ObjectId, target: ObjectId) -> Option<EdgeBitmap> {
        self.nodes.get(&source)?.outgoing.get(&target).copied()
    }

    /// Snapshot of the current node set; safe to mutate the graph while
    /// walking the returned list.
    pub fn node_ids(&self) -> Vec<ObjectId> {
        self.nodes.keys().copied().collect()
    }

    /// Snapshot of all edges as `(source, target, label)`.
    pub fn edges(&self) -> Vec<(ObjectId, ObjectId, EdgeBitmap)> {
        self.nodes
            .iter()
            .flat_map(|(&source, entry)| {
                entry
                    .outgoing
                    .iter()
                    .map(move |(&target, &label)| (source, target, label))
            })
            .collect()
    }

    /// Incident edges of `id`: for [`Direction::In`] the far endpoint is the
    /// edge source, for [`Direction::Out`] the edge target.
    pub fn edges_of(&self, id: ObjectId, direction: Direction) -> Vec<(ObjectId, EdgeBitmap)> {
        let Some(entry) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let adjacency = match direction {
            Direction::In => &entry.incoming,
            Direction::Out => &entry.outgoing,
        };
        adjacency.iter().map(|(&other, &label)| (other, label)).collect()
    }

    /// Nodes with in-degree 0.
    pub fn starting_nodes(&self) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .filter(|(_, e)| e.incoming.is_empty())
            .map(|(&id, _)| id)
            .collect()
    }

    /// Nodes with out-degree 0.
    pub fn ending_nodes(&self) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .filter(|(_, e)| e.outgoing.is_empty())
            .map(|(&id, _)| id)
            .collect()
    }

    /// Nodes with no incident edges at all.
    pub fn islands(&self) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .filter(|(_, e)| e.incoming.is_empty() && e.outgoing.is_empty())
            .map(|(&id, _)| id)
            .collect()
    }

    /// Node count.
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// Edge count.
    pub fn size(&self) -> usize {
        self.edge_count
    }

    /// Attach `key = value` to a node, creating the node when absent.
    pub fn set_node_data(&mut self, id: ObjectId, key: &str, value: serde_json::Value) {
        self.nodes
            .entry(id)
            .or_default()
            .data
            .insert(key.to_string(), value);
    }

    pub fn node_data(&self, id: ObjectId, key: &str) -> Option<&serde_json::Value> {
        self.nodes.get(&id)?.data.get(key)
    }

    /// The whole data map of a node.
    pub fn data(&self, id: ObjectId) -> Option<&HashMap<String, serde_json::Value>> {
        self.nodes.get(&id).map(|e| &e.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foothold_core::{EdgeKind, EdgeRegistry};

    fn kind(registry: &mut EdgeRegistry, name: &str) -> EdgeKind {
        registry.register(name).unwrap()
    }

    fn id(n: u32) -> ObjectId {
        ObjectId(n)
    }

    #[test]
    fn test_add_edge_creates_endpoints() {
        let mut registry = EdgeRegistry::new();
        let member = kind(&mut registry, "MemberOfGroup");

        let mut graph = AnalysisGraph::new();
        graph.add_edge(id(0), id(1), EdgeBitmap::single(member));

        assert!(graph.has_node(id(0)));
        assert!(graph.has_node(id(1)));
        assert_eq!(graph.order(), 2);
        assert_eq!(graph.size(), 1);
    }

    #[test]
    fn test_add_edge_unions_existing_label() {
        let mut registry = EdgeRegistry::new();
        let member = kind(&mut registry, "MemberOfGroup");
        let dacl = kind(&mut registry, "WriteDacl");

        let mut graph = AnalysisGraph::new();
        graph.add_edge(id(0), id(1), EdgeBitmap::single(member));
        graph.add_edge(id(0), id(1), EdgeBitmap::single(dacl));

        let label = graph.edge(id(0), id(1)).unwrap();
        assert!(label.is_set(member));
        assert!(label.is_set(dacl));
        assert_eq!(graph.size(), 1);
    }

    #[test]
    fn test_delete_node_purges_incident_edges_and_data() {
        let mut registry = EdgeRegistry::new();
        let member = kind(&mut registry, "MemberOfGroup");
        let bitmap = EdgeBitmap::single(member);

        let mut graph = AnalysisGraph::new();
        graph.add_edge(id(0), id(1), bitmap);
        graph.add_edge(id(1), id(2), bitmap);
        graph.add_edge(id(2), id(0), bitmap);
        graph.set_node_data(id(1), "target", true.into());

        graph.delete_node(id(1));

        assert_eq!(graph.order(), 2);
        assert_eq!(graph.size(), 1);
        assert!(graph.edge(id(2), id(0)).is_some());
        assert!(graph.edge(id(0), id(1)).is_none());
        assert!(graph.node_data(id(1), "target").is_none());

        // Deleting a missing node is a no-op.
        graph.delete_node(id(7));
        assert_eq!(graph.order(), 2);
    }

    #[test]
    fn test_self_loop_counted_once() {
        let mut registry = EdgeRegistry::new();
        let owns = kind(&mut registry, "Owns");

        let mut graph = AnalysisGraph::new();
        graph.add_edge(id(3), id(3), EdgeBitmap::single(owns));
        assert_eq!(graph.order(), 1);
        assert_eq!(graph.size(), 1);

        graph.delete_node(id(3));
        assert_eq!(graph.order(), 0);
        assert_eq!(graph.size(), 0);
    }

    #[test]
    fn test_boundary_node_queries() {
        let mut registry = EdgeRegistry::new();
        let member = kind(&mut registry, "MemberOfGroup");
        let bitmap = EdgeBitmap::single(member);

        // 0 -> 1 -> 2, and 9 floats alone.
        let mut graph = AnalysisGraph::new();
        graph.add_edge(id(0), id(1), bitmap);
        graph.add_edge(id(1), id(2), bitmap);
        graph.add_node(id(9));

        let mut starting = graph.starting_nodes();
        starting.sort();
        assert_eq!(starting, vec![id(0), id(9)]);

        let mut ending = graph.ending_nodes();
        ending.sort();
        assert_eq!(ending, vec![id(2), id(9)]);

        assert_eq!(graph.islands(), vec![id(9)]);
    }

    #[test]
    fn test_directional_edge_queries() {
        let mut registry = EdgeRegistry::new();
        let member = kind(&mut registry, "MemberOfGroup");
        let bitmap = EdgeBitmap::single(member);

        let mut graph = AnalysisGraph::new();
        graph.add_edge(id(0), id(1), bitmap);
        graph.add_edge(id(2), id(1), bitmap);

        let mut incoming: Vec<ObjectId> =
            graph.edges_of(id(1), Direction::In).into_iter().map(|(o, _)| o).collect();
        incoming.sort();
        assert_eq!(incoming, vec![id(0), id(2)]);
        assert!(graph.edges_of(id(1), Direction::Out).is_empty());
        assert!(graph.edges_of(id(42), Direction::In).is_empty());
    }

    #[test]
    fn test_set_node_data_creates_node() {
        let mut graph = AnalysisGraph::new();
        graph.set_node_data(id(5), "target", true.into());
        assert!(graph.has_node(id(5)));
        assert_eq!(graph.node_data(id(5), "target"), Some(&true.into()));
        assert_eq!(graph.node_data(id(5), "source"), None);
    }
}
