//! Error types for admission and crossing operations.

use thiserror::Error;

/// Errors produced by the gate, the dispenser station, and the worker driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Input was missing or malformed. Raised before any worker starts.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A worker was cancelled while blocked and has left the wait set.
    #[error("wait interrupted: {waiter}")]
    InterruptedWait {
        /// Identity of the interrupted waiter (cart or client).
        waiter: String,
    },
    /// A protocol invariant was broken. Indicates a bug, never bad input.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// A worker thread panicked before reporting its outcome.
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),
}

impl SimError {
    /// Shorthand for an interrupted wait by `waiter`.
    #[must_use]
    pub fn interrupted(waiter: impl Into<String>) -> Self {
        Self::InterruptedWait {
            waiter: waiter.into(),
        }
    }

    /// True when the error came from run-wide cancellation.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::InterruptedWait { .. })
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
