//! # Admission Lot
//!
//! Class-based admission control for shared exclusive resources, driven by one OS
//! thread per participant.
//!
//! Two coordination problems share the crate:
//!
//! - **Intersection**: supply carts (MACs) shuttle between supply rooms and emergency
//!   departments over two trails that meet at a single-lane intersection. A
//!   [`FairGate`] lets one cart at a time through, in arrival order, while per-trail
//!   crossing counters are updated inside the same critical section.
//! - **Dispenser station**: hot and cold clients share three dispensers. The
//!   [`core::DispenserStation`] monitor never mixes classes, assigns the lowest free
//!   dispenser, and keeps a logical clock of brew completion.
//!
//! ## Key Features
//!
//! - **Fair hand-off**: waiters are admitted strictly in the order they arrived
//! - **Mode exclusivity**: a station in hot mode admits only hot clients until it drains
//! - **Observable runs**: every step is reported as a [`core::SimEvent`] to an
//!   [`core::EventSink`], recorded inside the critical section it describes
//! - **Cancellation**: a [`core::Canceller`] unblocks every waiter with
//!   `SimError::InterruptedWait`
//! - **Pluggable pacing**: wall-clock pauses go through a [`core::Pacer`], so tests run
//!   without sleeping
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use admission_lot::builders::SimulationBuilder;
//! use admission_lot::config::{CrossingConfig, PacingConfig};
//! use admission_lot::core::InMemoryEventSink;
//!
//! let config = CrossingConfig::from_input_str("CSR1=1, CSR2=1, ED1=1, ED2=1, N=2")?;
//! let sink = Arc::new(InMemoryEventSink::new(1024));
//! let sim = SimulationBuilder::new(PacingConfig::instant())
//!     .with_events(sink.clone())
//!     .build_crossing(config)?;
//!
//! let report = sim.run()?;
//! assert_eq!(report.crossings, 8);
//! assert_eq!(report.totals.trail1 + report.totals.trail2, 8);
//! # Ok::<(), admission_lot::core::SimError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Fair single-slot gate with FIFO hand-off.
pub mod gate;
/// Core coordination: intersection, dispenser station, events, and the worker driver.
pub mod core;
/// Configuration models for runs and pacing.
pub mod config;
/// Builders to assemble simulations from configuration.
pub mod builders;
/// Async runtime adapters.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use gate::{FairGate, GateGuard, GateStats};
