//! foothold-store: The object population the analysis engine reads.
//!
//! Provides the in-memory [`ObjectStore`] arena with directional edge
//! adjacency, JSON snapshot loading, the built-in directory edge-kind set,
//! and the node-filter layer that upstream query tooling compiles into.

pub mod error;
pub mod filter;
pub mod kinds;
pub mod snapshot;
pub mod store;

pub use error::StoreError;
pub use filter::{BoxedFilter, FilterSpec, NodeFilter};
pub use kinds::{register_builtin, BuiltinKinds};
pub use snapshot::Snapshot;
pub use store::ObjectStore;
