//! foothold-core: Shared types for the Foothold attack-path analysis engine.
//!
//! This crate provides the foundational types used across all Foothold crates:
//! - Directory objects (principals, groups, computers, ...) with SIDs and
//!   integer-capable attribute maps
//! - The typed-edge model: edge kinds, fixed-width edge bitmaps, and the
//!   registry of per-kind probability callbacks
//! - Progress events for long-running analyses
//! - Common error types

pub mod edges;
pub mod error;
pub mod progress;
pub mod types;

pub use edges::{Direction, EdgeBitmap, EdgeKind, EdgeRegistry};
pub use error::CoreError;
pub use progress::{NullProgress, ProgressEvent, ProgressSink};
pub use types::{Object, ObjectId, ObjectType, Probability, Sid};
