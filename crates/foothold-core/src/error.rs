use thiserror::Error;

/// Errors from the core type layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Edge kind capacity exhausted: cannot register {name:?} beyond {capacity} kinds")]
    EdgeKindCapacity { name: String, capacity: usize },

    #[error("Invalid SID {input:?}: {reason}")]
    InvalidSid { input: String, reason: String },
}
