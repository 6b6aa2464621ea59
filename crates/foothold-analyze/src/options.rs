//! Engine configuration.

use std::collections::HashSet;
use std::fmt;

use foothold_core::{Direction, EdgeBitmap, EdgeKind, ObjectType, Probability};
use foothold_store::BoxedFilter;

/// Everything that shapes one analysis run.
///
/// The first/middle/last tiers apply to seeding (round 1), the expansion
/// rounds (2..), and the outer-layer trim respectively. Zero values mean
/// "unconstrained" throughout: blank edge bitmaps default to the registry
/// universe when all three tiers are blank, empty type sets are no filter,
/// `max_depth`/`max_outgoing_connections` of -1 are unbounded, and a
/// `node_limit` of 0 is unlimited.
pub struct AnalyzeOptions {
    pub filter_first: Option<BoxedFilter>,
    pub filter_middle: Option<BoxedFilter>,
    pub filter_last: Option<BoxedFilter>,

    pub object_types_first: HashSet<ObjectType>,
    pub object_types_middle: HashSet<ObjectType>,
    pub object_types_last: HashSet<ObjectType>,

    pub edges_first: EdgeBitmap,
    pub edges_middle: EdgeBitmap,
    pub edges_last: EdgeBitmap,

    pub direction: Direction,
    pub max_depth: i32,
    pub max_outgoing_connections: i32,
    /// How many rounds an already-discovered node stays eligible as a
    /// re-target.
    pub backlinks: u32,
    pub min_edge_probability: Probability,
    pub min_accumulated_probability: Probability,
    pub prune_islands: bool,
    /// Never expand the Everyone / Authenticated Users pseudo-principals
    /// (their transitive predecessors are the whole directory).
    pub dont_expand_aueo: bool,
    pub node_limit: usize,
    /// Attribute used as the tiebreak when the degree cap fires: remaining
    /// candidates are committed in descending attribute order.
    pub sort_by: Option<String>,
    /// Structural kind always committed first under the degree cap.
    pub group_priority_kind: Option<EdgeKind>,
}

impl fmt::Debug for AnalyzeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeOptions")
            .field("filter_first", &self.filter_first.is_some())
            .field("filter_middle", &self.filter_middle.is_some())
            .field("filter_last", &self.filter_last.is_some())
            .field("object_types_first", &self.object_types_first)
            .field("object_types_middle", &self.object_types_middle)
            .field("object_types_last", &self.object_types_last)
            .field("edges_first", &self.edges_first)
            .field("edges_middle", &self.edges_middle)
            .field("edges_last", &self.edges_last)
            .field("direction", &self.direction)
            .field("max_depth", &self.max_depth)
            .field("max_outgoing_connections", &self.max_outgoing_connections)
            .field("backlinks", &self.backlinks)
            .field("min_edge_probability", &self.min_edge_probability)
            .field(
                "min_accumulated_probability",
                &self.min_accumulated_probability,
            )
            .field("prune_islands", &self.prune_islands)
            .field("dont_expand_aueo", &self.dont_expand_aueo)
            .field("node_limit", &self.node_limit)
            .field("sort_by", &self.sort_by)
            .field("group_priority_kind", &self.group_priority_kind)
            .finish()
    }
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            filter_first: None,
            filter_middle: None,
            filter_last: None,
            object_types_first: HashSet::new(),
            object_types_middle: HashSet::new(),
            object_types_last: HashSet::new(),
            edges_first: EdgeBitmap::blank(),
            edges_middle: EdgeBitmap::blank(),
            edges_last: EdgeBitmap::blank(),
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
            group_priority_kind: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unconstrained() {
        let opts = AnalyzeOptions::default();
        assert_eq!(opts.direction, Direction::In);
        assert_eq!(opts.max_depth, -1);
        assert_eq!(opts.max_outgoing_connections, -1);
        assert_eq!(opts.backlinks, 0);
        assert_eq!(opts.min_edge_probability, 0);
        assert_eq!(opts.min_accumulated_probability, 0);
        assert!(!opts.prune_islands);
        assert!(opts.dont_expand_aueo);
        assert_eq!(opts.node_limit, 0);
        assert!(opts.edges_first.is_blank());
        assert!(opts.sort_by.is_none());
    }
}
