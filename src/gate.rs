//! Fair gate implementation.
//!
//! This module provides a single-slot exclusive gate built on top of `parking_lot`'s
//! `Mutex` and `Condvar`. Unlike a plain mutex, the gate hands the permit to waiters in
//! strict arrival order: a late arrival never overtakes an earlier one.
//!
//! # Features
//!
//! - FIFO hand-off between waiters
//! - RAII release through [`GateGuard`]
//! - Re-entrant acquisition reported as an error instead of a deadlock
//! - Run-wide shutdown that unblocks every waiter
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```
//! use admission_lot::FairGate;
//!
//! let gate = FairGate::new();
//! let guard = gate.acquire().unwrap();
//! assert!(gate.stats().held);
//! guard.release();
//! assert!(!gate.stats().held);
//! ```
//!
//! Concurrent access:
//!
//! ```
//! use admission_lot::FairGate;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::thread;
//!
//! let gate = Arc::new(FairGate::new());
//! let inside = Arc::new(AtomicUsize::new(0));
//! let mut handles = vec![];
//!
//! for _ in 0..8 {
//!     let gate = Arc::clone(&gate);
//!     let inside = Arc::clone(&inside);
//!     handles.push(thread::spawn(move || {
//!         let _guard = gate.acquire().unwrap();
//!         assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
//!         inside.fetch_sub(1, Ordering::SeqCst);
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(gate.stats().acquisitions, 8);
//! ```

use std::collections::VecDeque;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::SimError;

/// Snapshot of gate usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    /// Successful acquisitions since creation.
    pub acquisitions: u64,
    /// Acquisitions that had to queue behind a holder or earlier waiter.
    pub contended: u64,
    /// Waiters currently queued.
    pub waiting: usize,
    /// Whether the permit is currently held.
    pub held: bool,
}

#[derive(Debug, Default)]
struct GateState {
    next_ticket: u64,
    queue: VecDeque<u64>,
    holder: Option<ThreadId>,
    shutdown: bool,
    acquisitions: u64,
    contended: u64,
}

impl GateState {
    fn is_turn_of(&self, ticket: u64) -> bool {
        self.holder.is_none() && self.queue.front() == Some(&ticket)
    }
}

/// A single-slot, FIFO-fair exclusive gate.
///
/// Waiters are served strictly in the order they called [`FairGate::acquire`]. The permit is
/// returned by dropping the [`GateGuard`] (or calling [`GateGuard::release`]).
#[derive(Debug, Default)]
pub struct FairGate {
    state: Mutex<GateState>,
    turn: Condvar,
}

impl FairGate {
    /// Creates an open gate with no holder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks the calling thread until it is the sole holder of the gate.
    ///
    /// Interrupted waiters are identified by the current thread's name.
    ///
    /// # Errors
    ///
    /// - `SimError::InterruptedWait` if the gate is shut down before the permit is granted
    /// - `SimError::InvariantViolation` if the calling thread already holds the gate
    pub fn acquire(&self) -> Result<GateGuard<'_>, SimError> {
        let current = thread::current();
        let waiter = current.name().unwrap_or("unnamed").to_owned();
        self.acquire_for(&waiter)
    }

    /// Same as [`FairGate::acquire`], naming the waiter explicitly.
    ///
    /// # Errors
    ///
    /// See [`FairGate::acquire`].
    pub fn acquire_for(&self, waiter: &str) -> Result<GateGuard<'_>, SimError> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.holder == Some(me) {
            return Err(SimError::InvariantViolation(format!(
                "{waiter} tried to acquire the gate it already holds"
            )));
        }
        if state.shutdown {
            return Err(SimError::interrupted(waiter));
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        let contended = state.holder.is_some() || !state.queue.is_empty();
        state.queue.push_back(ticket);

        while !state.shutdown && !state.is_turn_of(ticket) {
            self.turn.wait(&mut state);
        }

        if state.shutdown {
            state.queue.retain(|queued| *queued != ticket);
            debug!(waiter, ticket, "gate wait interrupted");
            return Err(SimError::interrupted(waiter));
        }

        state.queue.pop_front();
        state.holder = Some(me);
        state.acquisitions += 1;
        if contended {
            state.contended += 1;
        }
        debug!(waiter, ticket, "gate acquired");

        Ok(GateGuard { gate: self })
    }

    /// Takes the permit only if the gate is free and nobody is queued.
    #[must_use]
    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        let mut state = self.state.lock();
        if state.shutdown || state.holder.is_some() || !state.queue.is_empty() {
            return None;
        }
        state.holder = Some(thread::current().id());
        state.acquisitions += 1;
        Some(GateGuard { gate: self })
    }

    /// Shuts the gate down: every queued and future waiter gets `InterruptedWait`.
    ///
    /// A current holder keeps the permit until it releases.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        let waiting = state.queue.len();
        drop(state);
        warn!(waiting, "gate shut down");
        self.turn.notify_all();
    }

    /// Whether [`FairGate::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Current usage snapshot.
    #[must_use]
    pub fn stats(&self) -> GateStats {
        let state = self.state.lock();
        GateStats {
            acquisitions: state.acquisitions,
            contended: state.contended,
            waiting: state.queue.len(),
            held: state.holder.is_some(),
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.holder = None;
        let waiting = !state.queue.is_empty();
        drop(state);
        // Every waiter re-checks; only the queue head proceeds.
        if waiting {
            self.turn.notify_all();
        }
    }
}

/// Proof of holding a [`FairGate`]. Dropping it releases the gate.
#[must_use = "the gate is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a FairGate,
}

impl GateGuard<'_> {
    /// Releases the gate, handing it to the longest-waiting thread.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
