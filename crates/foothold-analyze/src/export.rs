//! Result-graph serialization for downstream consumers.
//!
//! Converts the handle-keyed working graph back into guid-keyed records:
//! nodes with their data keys (`target`, `source`, `canexpand`) and edges
//! with kind names resolved through the registry. Output is sorted for
//! stable downstream diffs.

use std::collections::HashMap;

use foothold_core::{EdgeRegistry, ObjectType, Sid};
use foothold_store::ObjectStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::AnalysisGraph;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExport {
    pub guid: Uuid,
    pub name: String,
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<Sid>,
    /// Engine annotations: `target`, `source`, `canexpand`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
    /// Full attribute map, present only with `all_details`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeExport {
    pub source: Uuid,
    pub target: Uuid,
    pub kinds: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
}

impl GraphExport {
    pub fn from_graph(
        graph: &AnalysisGraph,
        store: &ObjectStore,
        registry: &EdgeRegistry,
        all_details: bool,
    ) -> Self {
        let mut nodes: Vec<NodeExport> = graph
            .node_ids()
            .into_iter()
            .map(|id| {
                let object = store.object(id);
                NodeExport {
                    guid: object.guid,
                    name: object.name.clone(),
                    object_type: object.object_type,
                    sid: object.sid.clone(),
                    data: graph.data(id).cloned().unwrap_or_default(),
                    attributes: all_details.then(|| object.attributes.clone()),
                }
            })
            .collect();
        nodes.sort_by(|a, b| a.guid.cmp(&b.guid));

        let mut edges: Vec<EdgeExport> = graph
            .edges()
            .into_iter()
            .map(|(source, target, label)| EdgeExport {
                source: store.object(source).guid,
                target: store.object(target).guid,
                kinds: label
                    .kinds()
                    .map(|kind| registry.name(kind).to_string())
                    .collect(),
            })
            .collect();
        edges.sort_by(|a, b| (a.source, a.target).cmp(&(b.source, b.target)));

        Self { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foothold_core::{EdgeBitmap, Object};

    #[test]
    fn test_export_resolves_guids_and_kind_names() {
        let mut registry = EdgeRegistry::new();
        let member = registry.register("MemberOfGroup").unwrap();

        let mut store = ObjectStore::new();
        let alice = store.insert(Object::new("alice", ObjectType::User).with_attr("adminCount", 1));
        let admins = store.insert(Object::new("Domain Admins", ObjectType::Group));

        let mut graph = AnalysisGraph::new();
        graph.add_edge(alice, admins, EdgeBitmap::single(member));
        graph.set_node_data(admins, "target", true.into());

        let export = GraphExport::from_graph(&graph, &store, &registry, false);
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.edges.len(), 1);
        assert_eq!(export.edges[0].kinds, vec!["MemberOfGroup"]);
        assert_eq!(export.edges[0].source, store.object(alice).guid);

        let admins_export = export
            .nodes
            .iter()
            .find(|n| n.name == "Domain Admins")
            .unwrap();
        assert_eq!(admins_export.data.get("target"), Some(&true.into()));

        // Without all_details, attributes stay home.
        let alice_export = export.nodes.iter().find(|n| n.name == "alice").unwrap();
        assert!(alice_export.attributes.is_none());

        let detailed = GraphExport::from_graph(&graph, &store, &registry, true);
        let alice_detailed = detailed.nodes.iter().find(|n| n.name == "alice").unwrap();
        assert_eq!(
            alice_detailed
                .attributes
                .as_ref()
                .and_then(|a| a.get("adminCount")),
            Some(&serde_json::json!(1))
        );
    }
}
