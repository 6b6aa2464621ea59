//! Error types for the foothold-analyze crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Store error: {0}")]
    Store(#[from] foothold_store::StoreError),

    #[error("Unknown edge kind in request: {name:?}")]
    UnknownEdgeKind { name: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;
