//! Builder that wires pacing, a pacer, and an event sink into a simulation.

use std::sync::Arc;

use crate::config::{CrossingConfig, PacingConfig, StationConfig};
use crate::core::{
    CrossingSimulation, EventSink, NoDelay, NullEventSink, Pacer, SimError, StationSimulation,
    ThreadSleep,
};

/// Assembles [`CrossingSimulation`] and [`StationSimulation`] instances.
///
/// Without an explicit pacer, instant pacing gets [`NoDelay`] and anything else gets
/// [`ThreadSleep`]. Without an explicit sink, events are discarded.
#[derive(Clone)]
pub struct SimulationBuilder {
    pacing: PacingConfig,
    pacer: Option<Arc<dyn Pacer>>,
    events: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for SimulationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationBuilder")
            .field("pacing", &self.pacing)
            .field("custom_pacer", &self.pacer.is_some())
            .field("custom_events", &self.events.is_some())
            .finish()
    }
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new(PacingConfig::default())
    }
}

impl SimulationBuilder {
    /// Start from `pacing`.
    #[must_use]
    pub const fn new(pacing: PacingConfig) -> Self {
        Self {
            pacing,
            pacer: None,
            events: None,
        }
    }

    /// Use `pacer` for every simulated pause.
    #[must_use]
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Report events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Pacing the built simulations use.
    #[must_use]
    pub const fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }

    fn pacer(&self) -> Arc<dyn Pacer> {
        self.pacer.clone().unwrap_or_else(|| {
            if self.pacing.is_instant() {
                Arc::new(NoDelay)
            } else {
                Arc::new(ThreadSleep)
            }
        })
    }

    fn events(&self) -> Arc<dyn EventSink> {
        self.events
            .clone()
            .unwrap_or_else(|| Arc::new(NullEventSink))
    }

    /// Build an intersection run.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` if `config` or the pacing is invalid.
    pub fn build_crossing(&self, config: CrossingConfig) -> Result<CrossingSimulation, SimError> {
        CrossingSimulation::new(config, &self.pacing, self.pacer(), self.events())
    }

    /// Build a dispenser station run.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` if `config` or the pacing is invalid.
    pub fn build_station(&self, config: StationConfig) -> Result<StationSimulation, SimError> {
        StationSimulation::new(config, &self.pacing, self.pacer(), self.events())
    }
}
