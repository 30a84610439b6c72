//! Observable run events and the sinks that collect them.
//!
//! Components record events while still inside their critical section, so the order a
//! sink sees is the order in which the protocol actually linearized.

use std::collections::VecDeque;
use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::{Cargo, Location, StationMode};

/// Something a reporting collaborator may want to observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    /// A cart queued at the intersection.
    CartWaiting {
        /// Cart number.
        cart: u32,
        /// Cargo carried.
        cargo: Cargo,
        /// Where the cart is heading.
        destination: Location,
    },
    /// A cart passed an intermediate checkpoint inside the intersection.
    CheckpointReached {
        /// Cart number.
        cart: u32,
        /// Cargo carried.
        cargo: Cargo,
        /// Checkpoint number, starting at 1.
        checkpoint: u32,
    },
    /// A cart left the intersection.
    CartCrossed {
        /// Cart number.
        cart: u32,
        /// Cargo carried.
        cargo: Cargo,
    },
    /// Counter snapshot published after a crossing.
    TrailTotals {
        /// Crossings on trail 1.
        trail1: u64,
        /// Crossings on trail 2.
        trail2: u64,
    },
    /// A cart completed all its trips.
    CartFinished {
        /// Cart number.
        cart: u32,
    },
    /// The dispenser station changed mode.
    ModeChanged {
        /// New mode.
        mode: StationMode,
    },
    /// A client occupied a dispenser.
    DispenserAssigned {
        /// Logical time of admission.
        at: u64,
        /// Client id.
        client: String,
        /// Dispenser number, starting at 1.
        dispenser: usize,
        /// Brew duration in time units.
        brew: u32,
    },
    /// A client released its dispenser.
    DispenserFreed {
        /// Logical time after the release.
        at: u64,
        /// Client id.
        client: String,
        /// Dispenser number, starting at 1.
        dispenser: usize,
    },
    /// Every worker finished and every brew drained.
    RunCompleted {
        /// Final logical time, for runs that keep one.
        at: Option<u64>,
    },
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CartWaiting {
                cart,
                cargo,
                destination,
            } => write!(
                f,
                "MAC-{cart} ({cargo}): Waiting at the Intersection. Going towards {destination}"
            ),
            Self::CheckpointReached {
                cart,
                cargo,
                checkpoint,
            } => write!(
                f,
                "MAC-{cart} ({cargo}): Crossing intersection Checkpoint {checkpoint}."
            ),
            Self::CartCrossed { cart, cargo } => {
                write!(f, "MAC-{cart} ({cargo}): Crossed the intersection.")
            }
            Self::TrailTotals { trail1, trail2 } => {
                write!(f, "Total crossed in Trail1: {trail1} Trail2: {trail2}")
            }
            Self::CartFinished { cart } => write!(f, "MAC-{cart}: Finished."),
            Self::ModeChanged { mode } => write!(f, "station mode: {mode}"),
            Self::DispenserAssigned {
                at,
                client,
                dispenser,
                brew,
            } => write!(f, "({at}) {client} uses dispenser {dispenser} (time: {brew})"),
            Self::DispenserFreed {
                at,
                client,
                dispenser,
            } => write!(f, "({at}) {client} leaves dispenser {dispenser}"),
            Self::RunCompleted { at: Some(at) } => write!(f, "({at}) DONE"),
            Self::RunCompleted { at: None } => f.write_str("DONE"),
        }
    }
}

/// Event sink abstraction.
pub trait EventSink: Send + Sync {
    /// Record an event. Called from inside critical sections; must not block for long.
    fn record(&self, event: SimEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn record(&self, _event: SimEvent) {}
}

/// In-memory event sink for testing and dev.
#[derive(Debug)]
pub struct InMemoryEventSink {
    events: Mutex<VecDeque<SimEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a new in-memory sink keeping at most `max_events` (oldest dropped first).
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<SimEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: SimEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Forwards events over a crossbeam channel to a reporting thread.
///
/// The receiving side ends once every clone of the sink is dropped.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: Sender<SimEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver that drains it.
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<SimEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn record(&self, event: SimEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}
