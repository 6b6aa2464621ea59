//! foothold-analyze: Attack-path expansion and pruning over a directory
//! object graph.
//!
//! Seeds a working graph from a target filter, expands it in bounded BFS
//! rounds through tiered edge/type/probability policies, then trims, budgets
//! and marks the result. The store is read-only for the duration of a call;
//! the returned graph is owned by the caller.

pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod options;
mod prune;
pub mod types;

pub use engine::{AnalysisEngine, AnalysisResults, NodeState};
pub use error::AnalyzeError;
pub use export::GraphExport;
pub use graph::AnalysisGraph;
pub use options::AnalyzeOptions;
pub use types::{AnalyzeRequest, AnalyzeResponse, GraphStats};
