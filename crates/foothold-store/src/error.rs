use thiserror::Error;

/// Errors from snapshot loading and store construction.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Core error: {0}")]
    Core(#[from] foothold_core::CoreError),

    #[error("Duplicate object guid {guid} in snapshot")]
    DuplicateGuid { guid: uuid::Uuid },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
