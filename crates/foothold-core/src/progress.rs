//! Progress events for long-running analyses.
//!
//! The engine reports coarse begin/advance/end events through a caller
//! supplied sink. There is no cancellation token in the engine contract;
//! callers that need cancellation interpose it here and discard the result.

/// A progress event emitted by an analysis phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent<'a> {
    /// A phase started. `total` is the expected step count, or -1 when
    /// unknown (unbounded depth).
    Begin { task: &'a str, total: i64 },
    /// The current phase advanced by `steps`.
    Advance { steps: u64 },
    /// The current phase finished.
    End,
}

/// Receiver for [`ProgressEvent`]s.
pub trait ProgressSink {
    fn event(&self, event: ProgressEvent<'_>);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn event(&self, _event: ProgressEvent<'_>) {}
}
