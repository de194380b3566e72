//! Error types produced by the fan-out collector.
//!
//! Stage and sub-operation failures are always the caller's own error type. The collector only
//! adds the two failures it can cause by itself, and hands them over through `From<CollectError>`
//! so they travel the same path as every other error in a chain.

use thiserror::Error;

/// Failures that originate in the collector rather than in a sub-operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CollectError {
    /// A sub-operation panicked while it was being polled.
    #[error("sub-operation #{index} panicked: {panic_message}")]
    TaskPanicked { index: usize, panic_message: String },

    /// Every sub-operation was dropped before it could record an outcome.
    ///
    /// This happens when the spawner discards the futures it is given, or the runtime shuts down
    /// while the batch is still pending.
    #[error("all sub-operations were dropped before the batch completed")]
    Abandoned,
}
