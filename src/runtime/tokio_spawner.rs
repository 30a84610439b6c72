//! Tokio adapter that runs blocking simulations off the async workers.

use std::sync::Arc;

use crate::core::{CrossingReport, CrossingSimulation, SimError, StationReport, StationSimulation};

/// Runs simulations on a tokio runtime's blocking pool.
///
/// The simulations themselves stay thread-based; this only lets an async caller await
/// their reports without blocking a runtime worker.
#[derive(Debug, Clone)]
pub struct TokioDriver {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioDriver {
    /// Create a driver from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Create a driver bound to the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Run an intersection simulation and await its report.
    ///
    /// # Errors
    ///
    /// The simulation's own error, or `SimError::WorkerPanicked` if the blocking task
    /// panicked or was cancelled.
    pub async fn run_crossing(&self, sim: CrossingSimulation) -> Result<CrossingReport, SimError> {
        self.handle
            .spawn_blocking(move || sim.run())
            .await
            .map_err(|e| SimError::WorkerPanicked(format!("crossing run: {e}")))?
    }

    /// Run a dispenser station simulation and await its report.
    ///
    /// # Errors
    ///
    /// The simulation's own error, or `SimError::WorkerPanicked` if the blocking task
    /// panicked or was cancelled.
    pub async fn run_station(&self, sim: StationSimulation) -> Result<StationReport, SimError> {
        self.handle
            .spawn_blocking(move || sim.run())
            .await
            .map_err(|e| SimError::WorkerPanicked(format!("station run: {e}")))?
    }
}
