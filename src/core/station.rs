//! Dispenser station monitor.
//!
//! A coffee station with a fixed number of dispensers serves two mutually exclusive client
//! classes. The station runs in one mode at a time: while it brews hot coffee no cold
//! client may hold a dispenser, and vice versa.
//!
//! # Protocol
//!
//! One `parking_lot::Mutex` guards the station state, with one `Condvar` per class plus a
//! third one signalled when the last brew finishes.
//!
//! - `request` queues the client under its class and waits while the station runs the
//!   other mode or every dispenser is busy. An idle station takes the mode of the first
//!   client admitted.
//! - `release` frees the dispenser. While dispensers are still busy, remaining waiters of
//!   the active class are woken to fill the freed slot. Once the station drains:
//!   no waiters at all moves it to idle; waiters of a single class hand the mode to that
//!   class; waiters of both classes hand it to the class holding the earliest arrival.
//!
//! The earliest-arrival rule is the tie-break: neither class can keep the station across a
//! drain if the other class has been waiting longer.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{EventSink, Pacer, SimError, SimEvent};

/// Number of dispensers at the station.
pub const DISPENSER_COUNT: usize = 3;

/// Client class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temperature {
    /// Hot coffee.
    Hot,
    /// Cold coffee.
    Cold,
}

impl Temperature {
    /// Class encoded by the first character of a client id (`H…` or `C…`).
    #[must_use]
    pub fn from_client_id(id: &str) -> Option<Self> {
        match id.chars().next() {
            Some('H') => Some(Self::Hot),
            Some('C') => Some(Self::Cold),
            _ => None,
        }
    }

    /// The other class.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Hot => Self::Cold,
            Self::Cold => Self::Hot,
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hot => f.write_str("hot"),
            Self::Cold => f.write_str("cold"),
        }
    }
}

/// Station-wide mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationMode {
    /// No class owns the station; every dispenser is free.
    Idle,
    /// Only hot clients may be admitted.
    Hot,
    /// Only cold clients may be admitted.
    Cold,
}

impl From<Option<Temperature>> for StationMode {
    fn from(mode: Option<Temperature>) -> Self {
        match mode {
            None => Self::Idle,
            Some(Temperature::Hot) => Self::Hot,
            Some(Temperature::Cold) => Self::Cold,
        }
    }
}

impl fmt::Display for StationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Hot => f.write_str("hot"),
            Self::Cold => f.write_str("cold"),
        }
    }
}

/// A coffee client. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    id: String,
    temperature: Temperature,
    brew: u32,
    position: usize,
}

impl Client {
    /// A client named `id` (class taken from its first character) brewing for `brew` units.
    ///
    /// `position` is the client's place in the input listing.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` if the id does not start with `H` or `C`.
    pub fn new(id: impl Into<String>, brew: u32, position: usize) -> Result<Self, SimError> {
        let id = id.into();
        let temperature = Temperature::from_client_id(&id).ok_or_else(|| {
            SimError::Configuration(format!("client id `{id}` must start with H or C"))
        })?;
        Ok(Self {
            id,
            temperature,
            brew,
            position,
        })
    }

    /// Client id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Client class.
    #[must_use]
    pub const fn temperature(&self) -> Temperature {
        self.temperature
    }

    /// Brew duration in time units.
    #[must_use]
    pub const fn brew(&self) -> u32 {
        self.brew
    }

    /// Place in the input listing.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

/// Proof that a client holds a dispenser. Consumed by [`DispenserStation::release`].
#[must_use = "an admitted client must release its dispenser"]
#[derive(Debug, PartialEq, Eq)]
pub struct DispenserTicket {
    slot: usize,
    client: String,
    temperature: Temperature,
    started_at: u64,
    brew: u32,
}

impl DispenserTicket {
    /// Dispenser number, starting at 1.
    #[must_use]
    pub const fn dispenser(&self) -> usize {
        self.slot + 1
    }

    /// Id of the client holding the dispenser.
    #[must_use]
    pub fn client(&self) -> &str {
        &self.client
    }

    /// Class of the holder.
    #[must_use]
    pub const fn temperature(&self) -> Temperature {
        self.temperature
    }

    /// Logical time at which brewing started.
    #[must_use]
    pub const fn started_at(&self) -> u64 {
        self.started_at
    }
}

/// Point-in-time view of the station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSnapshot {
    /// Active mode.
    pub mode: StationMode,
    /// Occupant of each dispenser.
    pub dispensers: Vec<Option<String>>,
    /// Hot clients queued but not yet admitted.
    pub hot_waiting: usize,
    /// Cold clients queued but not yet admitted.
    pub cold_waiting: usize,
    /// Brews in progress.
    pub brewing: usize,
    /// Clients that have released their dispenser.
    pub served: usize,
    /// Logical clock.
    pub clock: u64,
}

impl StationSnapshot {
    /// Number of occupied dispensers.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.dispensers.iter().filter(|slot| slot.is_some()).count()
    }
}

#[derive(Debug)]
struct StationState {
    mode: Option<Temperature>,
    slots: Vec<Option<(String, Temperature)>>,
    hot_queue: VecDeque<u64>,
    cold_queue: VecDeque<u64>,
    next_arrival: u64,
    brewing: usize,
    served: usize,
    clock: u64,
    shutdown: bool,
}

impl StationState {
    fn new(capacity: usize) -> Self {
        Self {
            mode: None,
            slots: vec![None; capacity],
            hot_queue: VecDeque::new(),
            cold_queue: VecDeque::new(),
            next_arrival: 0,
            brewing: 0,
            served: 0,
            clock: 0,
            shutdown: false,
        }
    }

    fn queue(&self, temperature: Temperature) -> &VecDeque<u64> {
        match temperature {
            Temperature::Hot => &self.hot_queue,
            Temperature::Cold => &self.cold_queue,
        }
    }

    fn queue_mut(&mut self, temperature: Temperature) -> &mut VecDeque<u64> {
        match temperature {
            Temperature::Hot => &mut self.hot_queue,
            Temperature::Cold => &mut self.cold_queue,
        }
    }

    fn leave_queue(&mut self, temperature: Temperature, arrival: u64) {
        self.queue_mut(temperature).retain(|queued| *queued != arrival);
    }

    fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    fn blocks(&self, temperature: Temperature) -> bool {
        self.mode == Some(temperature.opposite()) || self.free_slot().is_none()
    }

    /// Class that should own the station once it has drained.
    fn next_mode(&self) -> Option<Temperature> {
        match (self.hot_queue.front(), self.cold_queue.front()) {
            (None, None) => None,
            (Some(_), None) => Some(Temperature::Hot),
            (None, Some(_)) => Some(Temperature::Cold),
            (Some(hot), Some(cold)) if hot < cold => Some(Temperature::Hot),
            (Some(_), Some(_)) => Some(Temperature::Cold),
        }
    }

    fn check(&self) -> Result<(), SimError> {
        let occupied = self.occupied();
        if occupied != self.brewing {
            return Err(SimError::InvariantViolation(format!(
                "{occupied} dispensers occupied but {} brews in progress",
                self.brewing
            )));
        }
        if let Some((client, temperature)) = self
            .slots
            .iter()
            .flatten()
            .find(|(_, temperature)| self.mode != Some(*temperature))
        {
            return Err(SimError::InvariantViolation(format!(
                "{temperature} client {client} holds a dispenser while the station is {}",
                StationMode::from(self.mode)
            )));
        }
        Ok(())
    }

    fn snapshot(&self) -> StationSnapshot {
        StationSnapshot {
            mode: self.mode.into(),
            dispensers: self
                .slots
                .iter()
                .map(|slot| slot.as_ref().map(|(client, _)| client.clone()))
                .collect(),
            hot_waiting: self.hot_queue.len(),
            cold_waiting: self.cold_queue.len(),
            brewing: self.brewing,
            served: self.served,
            clock: self.clock,
        }
    }
}

/// Monitor guarding class-exclusive, capacity-bounded access to the dispensers.
pub struct DispenserStation {
    state: Mutex<StationState>,
    hot_turn: Condvar,
    cold_turn: Condvar,
    drained: Condvar,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for DispenserStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispenserStation")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl DispenserStation {
    /// A station with [`DISPENSER_COUNT`] dispensers.
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self::build(DISPENSER_COUNT, events)
    }

    /// A station with `capacity` dispensers.
    ///
    /// # Errors
    ///
    /// `SimError::Configuration` if `capacity` is zero.
    pub fn with_capacity(capacity: usize, events: Arc<dyn EventSink>) -> Result<Self, SimError> {
        if capacity == 0 {
            return Err(SimError::Configuration(
                "a station needs at least one dispenser".into(),
            ));
        }
        Ok(Self::build(capacity, events))
    }

    fn build(capacity: usize, events: Arc<dyn EventSink>) -> Self {
        Self {
            state: Mutex::new(StationState::new(capacity)),
            hot_turn: Condvar::new(),
            cold_turn: Condvar::new(),
            drained: Condvar::new(),
            events,
        }
    }

    fn turn(&self, temperature: Temperature) -> &Condvar {
        match temperature {
            Temperature::Hot => &self.hot_turn,
            Temperature::Cold => &self.cold_turn,
        }
    }

    /// Number of dispensers.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Block until `client` may occupy a dispenser, then occupy the lowest free one.
    ///
    /// Returns as soon as the dispenser is assigned; brewing happens outside the monitor.
    ///
    /// # Errors
    ///
    /// - `SimError::InterruptedWait` if the station shuts down while the client waits
    /// - `SimError::InvariantViolation` if the admission would break mode exclusivity or
    ///   capacity (a monitor bug)
    pub fn request(&self, client: &Client) -> Result<DispenserTicket, SimError> {
        let temperature = client.temperature;
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(SimError::interrupted(client.id.as_str()));
        }

        let arrival = state.next_arrival;
        state.next_arrival += 1;
        state.queue_mut(temperature).push_back(arrival);

        while !state.shutdown && state.blocks(temperature) {
            self.turn(temperature).wait(&mut state);
        }

        state.leave_queue(temperature, arrival);
        if state.shutdown {
            self.settle(&mut state);
            debug!(client = %client.id, "dispenser wait interrupted");
            return Err(SimError::interrupted(client.id.as_str()));
        }

        if state.mode.is_none() {
            self.switch_mode(&mut state, Some(temperature));
        }
        let slot = state.free_slot().ok_or_else(|| {
            SimError::InvariantViolation(format!("{} admitted without a free dispenser", client.id))
        })?;
        state.slots[slot] = Some((client.id.clone(), temperature));
        state.brewing += 1;
        state.check()?;

        let started_at = state.clock;
        self.events.record(SimEvent::DispenserAssigned {
            at: started_at,
            client: client.id.clone(),
            dispenser: slot + 1,
            brew: client.brew,
        });
        debug!(client = %client.id, dispenser = slot + 1, mode = %temperature, "dispenser assigned");

        Ok(DispenserTicket {
            slot,
            client: client.id.clone(),
            temperature,
            started_at,
            brew: client.brew,
        })
    }

    /// Free the ticket's dispenser and wake whichever waiters may now proceed.
    ///
    /// Advances the logical clock to the end of this brew if that is later than now.
    ///
    /// # Errors
    ///
    /// `SimError::InvariantViolation` if the dispenser is not held by the ticket's client.
    pub fn release(&self, ticket: DispenserTicket) -> Result<(), SimError> {
        let mut state = self.state.lock();
        let held = matches!(
            state.slots.get(ticket.slot),
            Some(Some((occupant, _))) if *occupant == ticket.client
        );
        if !held {
            return Err(SimError::InvariantViolation(format!(
                "dispenser {} released by {} but not held by it",
                ticket.dispenser(),
                ticket.client
            )));
        }

        state.slots[ticket.slot] = None;
        state.brewing -= 1;
        state.served += 1;
        state.clock = state
            .clock
            .max(ticket.started_at + u64::from(ticket.brew));

        self.events.record(SimEvent::DispenserFreed {
            at: state.clock,
            client: ticket.client.clone(),
            dispenser: ticket.dispenser(),
        });
        debug!(client = %ticket.client, dispenser = ticket.dispenser(), "dispenser freed");

        self.settle(&mut state);
        if state.brewing == 0 {
            self.drained.notify_all();
        }
        state.check()
    }

    /// Request, brew for `client.brew() × brew_unit` outside the monitor, then release.
    ///
    /// Returns the dispenser number that served the client.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`DispenserStation::request`] and
    /// [`DispenserStation::release`].
    pub fn serve(
        &self,
        client: &Client,
        pacer: &dyn Pacer,
        brew_unit: Duration,
    ) -> Result<usize, SimError> {
        let ticket = self.request(client)?;
        let dispenser = ticket.dispenser();
        pacer.pause(brew_unit.saturating_mul(client.brew));
        self.release(ticket)?;
        Ok(dispenser)
    }

    /// Block until no brew is in progress; returns the logical clock at that point.
    pub fn await_all_idle(&self) -> u64 {
        let mut state = self.state.lock();
        self.drained.wait_while(&mut state, |state| state.brewing > 0);
        state.clock
    }

    /// Like [`DispenserStation::await_all_idle`], giving up after `timeout`.
    #[must_use]
    pub fn await_all_idle_for(&self, timeout: Duration) -> Option<u64> {
        let mut state = self.state.lock();
        self.drained
            .wait_while_for(&mut state, |state| state.brewing > 0, timeout);
        (state.brewing == 0).then_some(state.clock)
    }

    /// Interrupt every waiting client. Clients already brewing finish and release normally.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        warn!(
            hot_waiting = state.hot_queue.len(),
            cold_waiting = state.cold_queue.len(),
            "dispenser station shut down"
        );
        drop(state);
        self.hot_turn.notify_all();
        self.cold_turn.notify_all();
        self.drained.notify_all();
    }

    /// Current state of the station.
    #[must_use]
    pub fn snapshot(&self) -> StationSnapshot {
        self.state.lock().snapshot()
    }

    /// Hand the station to the right class after a slot was freed or a waiter left.
    fn settle(&self, state: &mut StationState) {
        if state.occupied() > 0 {
            if let Some(mode) = state.mode {
                if !state.queue(mode).is_empty() {
                    self.turn(mode).notify_all();
                }
            }
            return;
        }

        let next = state.next_mode();
        if next != state.mode {
            self.switch_mode(state, next);
        }
        if let Some(mode) = next {
            self.turn(mode).notify_all();
        }
    }

    fn switch_mode(&self, state: &mut StationState, mode: Option<Temperature>) {
        state.mode = mode;
        let mode = StationMode::from(mode);
        info!(%mode, "station mode changed");
        self.events.record(SimEvent::ModeChanged { mode });
    }
}
