//! Intersection controller for autonomous carts.
//!
//! Carts shuttle between a central supply room (CSR) and an emergency department (ED) on
//! one of two trails. Both trails share a single intersection that only one cart may
//! occupy at a time; entry is arbitrated by a [`FairGate`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PacingConfig;
use crate::core::{EventSink, Pacer, SimError, SimEvent};
use crate::gate::{FairGate, GateStats};

/// Route endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    /// Central supply room 1.
    #[serde(rename = "CSR1")]
    Csr1,
    /// Central supply room 2.
    #[serde(rename = "CSR2")]
    Csr2,
    /// Emergency department 1.
    #[serde(rename = "ED1")]
    Ed1,
    /// Emergency department 2.
    #[serde(rename = "ED2")]
    Ed2,
}

impl Location {
    /// All locations in cart creation order.
    pub const ALL: [Self; 4] = [Self::Csr1, Self::Csr2, Self::Ed1, Self::Ed2];

    /// Trail this location belongs to.
    #[must_use]
    pub const fn trail(self) -> Trail {
        match self {
            Self::Csr1 | Self::Ed1 => Trail::One,
            Self::Csr2 | Self::Ed2 => Trail::Two,
        }
    }

    /// The location at the other end of this location's trail.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Csr1 => Self::Ed1,
            Self::Ed1 => Self::Csr1,
            Self::Csr2 => Self::Ed2,
            Self::Ed2 => Self::Csr2,
        }
    }

    /// Whether this is a supply room.
    #[must_use]
    pub const fn is_supply_room(self) -> bool {
        matches!(self, Self::Csr1 | Self::Csr2)
    }

    /// Input/output label (`CSR1`, `ED2`, ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Csr1 => "CSR1",
            Self::Csr2 => "CSR2",
            Self::Ed1 => "ED1",
            Self::Ed2 => "ED2",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pairing of routes that share a crossing counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trail {
    /// CSR1 ↔ ED1.
    One,
    /// CSR2 ↔ ED2.
    Two,
}

/// One of the four directed edges a cart can travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Route {
    /// CSR1 → ED1.
    Csr1ToEd1,
    /// ED1 → CSR1.
    Ed1ToCsr1,
    /// CSR2 → ED2.
    Csr2ToEd2,
    /// ED2 → CSR2.
    Ed2ToCsr2,
}

impl Route {
    /// The route leaving `origin`.
    #[must_use]
    pub const fn from_origin(origin: Location) -> Self {
        match origin {
            Location::Csr1 => Self::Csr1ToEd1,
            Location::Ed1 => Self::Ed1ToCsr1,
            Location::Csr2 => Self::Csr2ToEd2,
            Location::Ed2 => Self::Ed2ToCsr2,
        }
    }

    /// Where the route starts.
    #[must_use]
    pub const fn origin(self) -> Location {
        match self {
            Self::Csr1ToEd1 => Location::Csr1,
            Self::Ed1ToCsr1 => Location::Ed1,
            Self::Csr2ToEd2 => Location::Csr2,
            Self::Ed2ToCsr2 => Location::Ed2,
        }
    }

    /// Where the route ends.
    #[must_use]
    pub const fn destination(self) -> Location {
        self.origin().counterpart()
    }

    /// The same edge travelled the other way.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self::from_origin(self.destination())
    }

    /// Trail whose counter this route increments.
    #[must_use]
    pub const fn trail(self) -> Trail {
        self.origin().trail()
    }
}

/// What a cart is carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cargo {
    /// Loaded with supplies, heading to a department.
    Stock,
    /// Returning empty to a supply room.
    Empty,
}

impl Cargo {
    /// Cargo after unloading or loading at the destination.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Stock => Self::Empty,
            Self::Empty => Self::Stock,
        }
    }
}

impl fmt::Display for Cargo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stock => f.write_str("Stock"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// An autonomous cart. Owned and mutated only by its own worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    id: u32,
    route: Route,
    cargo: Cargo,
    remaining: u32,
}

impl Cart {
    /// A cart starting at `origin` that must cross the intersection `trips` times.
    ///
    /// Carts leaving a supply room carry stock; carts leaving a department run empty.
    #[must_use]
    pub const fn new(id: u32, origin: Location, trips: u32) -> Self {
        let cargo = if origin.is_supply_room() {
            Cargo::Stock
        } else {
            Cargo::Empty
        };
        Self {
            id,
            route: Route::from_origin(origin),
            cargo,
            remaining: trips,
        }
    }

    /// Cart number.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Route of the next crossing.
    #[must_use]
    pub const fn route(&self) -> Route {
        self.route
    }

    /// Current cargo.
    #[must_use]
    pub const fn cargo(&self) -> Cargo {
        self.cargo
    }

    /// Crossings still to perform.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether every trip is done.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Display label, e.g. `MAC-3`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("MAC-{}", self.id)
    }

    /// Turn around after a crossing: reverse route, flip cargo, count the trip.
    pub fn complete_trip(&mut self) {
        self.route = self.route.reversed();
        self.cargo = self.cargo.flipped();
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// Per-trail crossing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailCounts {
    /// Crossings by carts on CSR1 ↔ ED1.
    pub trail1: u64,
    /// Crossings by carts on CSR2 ↔ ED2.
    pub trail2: u64,
}

impl TrailCounts {
    /// Sum over both trails.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.trail1 + self.trail2
    }

    fn record(&mut self, trail: Trail) {
        match trail {
            Trail::One => self.trail1 += 1,
            Trail::Two => self.trail2 += 1,
        }
    }
}

/// Outcome of one cart's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    /// Cart number.
    pub cart: u32,
    /// Crossings performed.
    pub crossings: u32,
}

/// The shared intersection: a fair gate plus the trail counters.
pub struct Intersection {
    gate: FairGate,
    totals: Mutex<TrailCounts>,
    checkpoints: u32,
    checkpoint_delay: Duration,
    pacer: Arc<dyn Pacer>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for Intersection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intersection")
            .field("gate", &self.gate)
            .field("totals", &*self.totals.lock())
            .field("checkpoints", &self.checkpoints)
            .field("checkpoint_delay", &self.checkpoint_delay)
            .finish_non_exhaustive()
    }
}

impl Intersection {
    /// Create an intersection paced by `pacer` and reporting to `events`.
    pub fn new(pacing: &PacingConfig, pacer: Arc<dyn Pacer>, events: Arc<dyn EventSink>) -> Self {
        Self {
            gate: FairGate::new(),
            totals: Mutex::new(TrailCounts::default()),
            checkpoints: pacing.checkpoint_count,
            checkpoint_delay: pacing.checkpoint_delay(),
            pacer,
            events,
        }
    }

    /// Cross the intersection once on the cart's current route.
    ///
    /// Waits for the gate, walks the checkpoint sequence, bumps the counter of the cart's
    /// trail and publishes the new totals, all while holding the gate.
    ///
    /// # Errors
    ///
    /// `SimError::InterruptedWait` if the run is cancelled before the cart gets the gate.
    pub fn cross(&self, cart: &Cart) -> Result<TrailCounts, SimError> {
        let label = cart.label();
        self.events.record(SimEvent::CartWaiting {
            cart: cart.id,
            cargo: cart.cargo,
            destination: cart.route.destination(),
        });

        let guard = self.gate.acquire_for(&label)?;

        for checkpoint in 1..=self.checkpoints {
            self.events.record(SimEvent::CheckpointReached {
                cart: cart.id,
                cargo: cart.cargo,
                checkpoint,
            });
            self.pacer.pause(self.checkpoint_delay);
        }
        self.events.record(SimEvent::CartCrossed {
            cart: cart.id,
            cargo: cart.cargo,
        });

        let totals = {
            let mut totals = self.totals.lock();
            totals.record(cart.route.trail());
            self.events.record(SimEvent::TrailTotals {
                trail1: totals.trail1,
                trail2: totals.trail2,
            });
            *totals
        };
        guard.release();

        debug!(
            cart = %label,
            trail1 = totals.trail1,
            trail2 = totals.trail2,
            "cart crossed"
        );
        Ok(totals)
    }

    /// Run every remaining trip of `cart`, turning it around after each crossing.
    ///
    /// # Errors
    ///
    /// Propagates `SimError::InterruptedWait` from [`Intersection::cross`]; trips already
    /// completed stay counted.
    pub fn drive(&self, mut cart: Cart) -> Result<CartSummary, SimError> {
        let mut crossings = 0;
        while !cart.is_done() {
            self.cross(&cart)?;
            cart.complete_trip();
            crossings += 1;
        }
        self.events.record(SimEvent::CartFinished { cart: cart.id });
        Ok(CartSummary {
            cart: cart.id,
            crossings,
        })
    }

    /// Current trail counters.
    #[must_use]
    pub fn totals(&self) -> TrailCounts {
        *self.totals.lock()
    }

    /// Usage snapshot of the underlying gate.
    #[must_use]
    pub fn gate_stats(&self) -> GateStats {
        self.gate.stats()
    }

    /// Unblock every cart waiting for the gate.
    pub fn shutdown(&self) {
        self.gate.shutdown();
    }
}

/// Number of carts starting on each route.
pub type RouteCounts = BTreeMap<Route, u32>;
