//! Request and response types for the CLI surface.
//!
//! An [`AnalyzeRequest`] is the wire form of [`AnalyzeOptions`]: filters as
//! declarative specs, edge tiers as kind-name lists. Unspecified fields take
//! the engine defaults.

use chrono::{DateTime, Utc};
use foothold_core::{Direction, EdgeBitmap, EdgeRegistry, ObjectType, Probability};
use foothold_store::FilterSpec;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, Result};
use crate::export::GraphExport;
use crate::options::AnalyzeOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    pub filter_first: Option<FilterSpec>,
    pub filter_middle: Option<FilterSpec>,
    pub filter_last: Option<FilterSpec>,

    pub object_types_first: Vec<ObjectType>,
    pub object_types_middle: Vec<ObjectType>,
    pub object_types_last: Vec<ObjectType>,

    /// Edge kind names per tier; all empty means every registered kind.
    pub edges_first: Vec<String>,
    pub edges_middle: Vec<String>,
    pub edges_last: Vec<String>,

    pub direction: Direction,
    pub max_depth: i32,
    pub max_outgoing_connections: i32,
    pub backlinks: u32,
    pub min_edge_probability: Probability,
    pub min_accumulated_probability: Probability,
    pub prune_islands: bool,
    pub dont_expand_aueo: bool,
    pub node_limit: usize,
    pub sort_by: Option<String>,
    /// Export full attribute maps per node.
    pub all_details: bool,
}

impl Default for AnalyzeRequest {
    fn default() -> Self {
        Self {
            filter_first: None,
            filter_middle: None,
            filter_last: None,
            object_types_first: Vec::new(),
            object_types_middle: Vec::new(),
            object_types_last: Vec::new(),
            edges_first: Vec::new(),
            edges_middle: Vec::new(),
            edges_last: Vec::new(),
            direction: Direction::In,
            max_depth: -1,
            max_outgoing_connections: -1,
            backlinks: 0,
            min_edge_probability: 0,
            min_accumulated_probability: 0,
            prune_islands: false,
            dont_expand_aueo: true,
            node_limit: 0,
            sort_by: None,
            all_details: false,
        }
    }
}

impl AnalyzeRequest {
    /// Resolve kind names and compile filters against `registry`.
    pub fn to_options(&self, registry: &EdgeRegistry) -> Result<AnalyzeOptions> {
        Ok(AnalyzeOptions {
            filter_first: self.filter_first.as_ref().map(FilterSpec::compile),
            filter_middle: self.filter_middle.as_ref().map(FilterSpec::compile),
            filter_last: self.filter_last.as_ref().map(FilterSpec::compile),
            object_types_first: self.object_types_first.iter().copied().collect(),
            object_types_middle: self.object_types_middle.iter().copied().collect(),
            object_types_last: self.object_types_last.iter().copied().collect(),
            edges_first: resolve_kinds(registry, &self.edges_first)?,
            edges_middle: resolve_kinds(registry, &self.edges_middle)?,
            edges_last: resolve_kinds(registry, &self.edges_last)?,
            direction: self.direction,
            max_depth: self.max_depth,
            max_outgoing_connections: self.max_outgoing_connections,
            backlinks: self.backlinks,
            min_edge_probability: self.min_edge_probability,
            min_accumulated_probability: self.min_accumulated_probability,
            prune_islands: self.prune_islands,
            dont_expand_aueo: self.dont_expand_aueo,
            node_limit: self.node_limit,
            sort_by: self.sort_by.clone(),
            group_priority_kind: registry.kind("MemberOfGroup"),
        })
    }
}

fn resolve_kinds(registry: &EdgeRegistry, names: &[String]) -> Result<EdgeBitmap> {
    let mut bitmap = EdgeBitmap::blank();
    for name in names {
        let kind = registry
            .kind(name)
            .ok_or_else(|| AnalyzeError::UnknownEdgeKind { name: name.clone() })?;
        bitmap.set(kind);
    }
    Ok(bitmap)
}

/// Summary counters alongside the exported graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub target_count: usize,
    pub source_count: usize,
}

/// Complete result of one analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub graph: GraphExport,
    pub stats: GraphStats,
    /// Nodes dropped after the outer-layer trim (node budget + islands).
    pub removed: usize,
    pub computed_at: DateTime<Utc>,
    pub duration_ms: u64,
}
