//! Worker driver: one OS thread per cart or client, fan out and join.
//!
//! The driver owns nothing but the shared context object of a run (the intersection or
//! the station, plus pacing and the event sink). Workers receive an `Arc` of it; there is
//! no process-wide state.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{CrossingConfig, PacingConfig, StationConfig};
use crate::core::{
    DispenserStation, EventSink, Intersection, Pacer, SimError, SimEvent, TrailCounts,
};

/// A shared resource that can be shut down to unblock its waiters.
pub trait Shutdown: Send + Sync {
    /// Wake every blocked waiter with `SimError::InterruptedWait`.
    fn shutdown(&self);
}

impl Shutdown for Intersection {
    fn shutdown(&self) {
        Self::shutdown(self);
    }
}

impl Shutdown for DispenserStation {
    fn shutdown(&self) {
        Self::shutdown(self);
    }
}

/// Run-wide cancellation handle.
#[derive(Clone)]
pub struct Canceller {
    targets: Vec<Arc<dyn Shutdown>>,
}

impl Canceller {
    /// A handle that shuts down every resource in `targets`.
    #[must_use]
    pub fn new(targets: Vec<Arc<dyn Shutdown>>) -> Self {
        Self { targets }
    }

    /// Cancel the run. Blocked workers return `InterruptedWait`; work already inside a
    /// critical section completes.
    pub fn cancel(&self) {
        warn!(resources = self.targets.len(), "cancelling run");
        for target in &self.targets {
            target.shutdown();
        }
    }
}

impl std::fmt::Debug for Canceller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canceller")
            .field("targets", &self.targets.len())
            .finish()
    }
}

/// Spawn one named thread per worker, wait for all of them, and collect their outcomes.
///
/// Every spawned worker is joined even if another one fails; the first error in worker
/// order is returned.
///
/// # Errors
///
/// - the first `Err` returned by a worker
/// - `SimError::WorkerPanicked` if a worker panicked
/// - `SimError::Spawn` if a thread could not be started
pub fn fan_out<T, F>(workers: Vec<(String, F)>) -> Result<Vec<T>, SimError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SimError> + Send + 'static,
{
    let mut handles: Vec<(String, JoinHandle<Result<T, SimError>>)> =
        Vec::with_capacity(workers.len());
    let mut first_error = None;

    for (name, work) in workers {
        match thread::Builder::new().name(name.clone()).spawn(work) {
            Ok(handle) => handles.push((name, handle)),
            Err(e) => {
                error!(worker = %name, error = %e, "failed to spawn worker");
                first_error = Some(SimError::Spawn(format!("{name}: {e}")));
                break;
            }
        }
    }
    debug!(workers = handles.len(), "workers started");

    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.join() {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(e)) => {
                debug!(worker = %name, error = %e, "worker failed");
                first_error.get_or_insert(e);
            }
            Err(_) => {
                error!(worker = %name, "worker panicked");
                first_error.get_or_insert(SimError::WorkerPanicked(name));
            }
        }
    }

    first_error.map_or(Ok(outcomes), Err)
}

fn elapsed_ms(started: Instant) -> u128 {
    started.elapsed().as_millis()
}

/// Result of a completed crossing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// Number of carts driven.
    pub carts: usize,
    /// Crossings performed by all carts.
    pub crossings: u64,
    /// Final trail counters.
    pub totals: TrailCounts,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u128,
}

/// Intersection problem: every cart crosses the shared intersection `N` times.
pub struct CrossingSimulation {
    config: CrossingConfig,
    intersection: Arc<Intersection>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for CrossingSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossingSimulation")
            .field("config", &self.config)
            .field("intersection", &self.intersection)
            .finish_non_exhaustive()
    }
}

impl CrossingSimulation {
    /// Set up a run for `config`.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` if either configuration is invalid.
    pub fn new(
        config: CrossingConfig,
        pacing: &PacingConfig,
        pacer: Arc<dyn Pacer>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, SimError> {
        config.validate().map_err(SimError::Configuration)?;
        pacing.validate().map_err(SimError::Configuration)?;
        let intersection = Arc::new(Intersection::new(pacing, pacer, Arc::clone(&events)));
        Ok(Self {
            config,
            intersection,
            events,
        })
    }

    /// The shared intersection.
    #[must_use]
    pub const fn intersection(&self) -> &Arc<Intersection> {
        &self.intersection
    }

    /// Handle that cancels this run from another thread.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        let intersection: Arc<dyn Shutdown> = self.intersection.clone();
        Canceller::new(vec![intersection])
    }

    /// Drive every cart to completion.
    ///
    /// # Errors
    ///
    /// Propagates the first worker error, e.g. `InterruptedWait` after cancellation.
    pub fn run(&self) -> Result<CrossingReport, SimError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let carts = self.config.carts();
        info!(
            %run_id,
            carts = carts.len(),
            repetitions = self.config.repetitions,
            "starting crossing run"
        );

        let workers = carts
            .into_iter()
            .map(|cart| {
                let intersection = Arc::clone(&self.intersection);
                (format!("mac-{}", cart.id()), move || intersection.drive(cart))
            })
            .collect();
        let summaries = fan_out(workers)?;

        let totals = self.intersection.totals();
        let crossings: u64 = summaries
            .iter()
            .map(|summary| u64::from(summary.crossings))
            .sum();
        if crossings != totals.total() {
            return Err(SimError::InvariantViolation(format!(
                "{crossings} crossings performed but counters sum to {}",
                totals.total()
            )));
        }
        self.events.record(SimEvent::RunCompleted { at: None });

        let report = CrossingReport {
            run_id,
            carts: summaries.len(),
            crossings,
            totals,
            elapsed_ms: elapsed_ms(started),
        };
        info!(
            %run_id,
            trail1 = totals.trail1,
            trail2 = totals.trail2,
            elapsed_ms = report.elapsed_ms,
            "crossing run finished"
        );
        Ok(report)
    }
}

/// Result of a completed station run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// Clients submitted.
    pub clients: usize,
    /// Clients that brewed and released a dispenser.
    pub served: usize,
    /// Logical time when the last brew finished.
    pub finished_at: u64,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u128,
}

/// Dispenser problem: every client brews once at the shared station.
pub struct StationSimulation {
    config: StationConfig,
    station: Arc<DispenserStation>,
    pacer: Arc<dyn Pacer>,
    brew_unit: Duration,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StationSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationSimulation")
            .field("config", &self.config)
            .field("station", &self.station)
            .field("brew_unit", &self.brew_unit)
            .finish_non_exhaustive()
    }
}

impl StationSimulation {
    /// Set up a run for `config`.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` if either configuration is invalid.
    pub fn new(
        config: StationConfig,
        pacing: &PacingConfig,
        pacer: Arc<dyn Pacer>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, SimError> {
        config.validate().map_err(SimError::Configuration)?;
        pacing.validate().map_err(SimError::Configuration)?;
        let station = Arc::new(DispenserStation::new(Arc::clone(&events)));
        Ok(Self {
            config,
            station,
            pacer,
            brew_unit: pacing.brew_unit(),
            events,
        })
    }

    /// The shared station.
    #[must_use]
    pub const fn station(&self) -> &Arc<DispenserStation> {
        &self.station
    }

    /// Handle that cancels this run from another thread.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        let station: Arc<dyn Shutdown> = self.station.clone();
        Canceller::new(vec![station])
    }

    /// Serve every client, then wait for the last brew to drain.
    ///
    /// # Errors
    ///
    /// Propagates the first worker error, e.g. `InterruptedWait` after cancellation.
    pub fn run(&self) -> Result<StationReport, SimError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let clients = self.config.clients()?;
        info!(%run_id, clients = clients.len(), "starting station run");

        let workers = clients
            .into_iter()
            .map(|client| {
                let station = Arc::clone(&self.station);
                let pacer = Arc::clone(&self.pacer);
                let brew_unit = self.brew_unit;
                (format!("client-{}", client.id()), move || {
                    station.serve(&client, pacer.as_ref(), brew_unit)
                })
            })
            .collect();
        let served = fan_out(workers)?.len();

        let finished_at = self.station.await_all_idle();
        self.events.record(SimEvent::RunCompleted {
            at: Some(finished_at),
        });

        let report = StationReport {
            run_id,
            clients: self.config.clients.len(),
            served,
            finished_at,
            elapsed_ms: elapsed_ms(started),
        };
        info!(
            %run_id,
            served,
            finished_at,
            elapsed_ms = report.elapsed_ms,
            "station run finished"
        );
        Ok(report)
    }
}
