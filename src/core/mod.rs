//! Core coordination: the intersection controller, the dispenser monitor, and the driver.

pub mod driver;
pub mod error;
pub mod events;
pub mod intersection;
pub mod pacing;
pub mod station;

pub use driver::{
    fan_out, Canceller, CrossingReport, CrossingSimulation, Shutdown, StationReport,
    StationSimulation,
};
pub use error::{AppResult, SimError};
pub use events::{ChannelEventSink, EventSink, InMemoryEventSink, NullEventSink, SimEvent};
pub use intersection::{
    Cargo, Cart, CartSummary, Intersection, Location, Route, RouteCounts, Trail, TrailCounts,
};
pub use pacing::{NoDelay, Pacer, ThreadSleep};
pub use station::{
    Client, DispenserStation, DispenserTicket, StationMode, StationSnapshot, Temperature,
    DISPENSER_COUNT,
};
