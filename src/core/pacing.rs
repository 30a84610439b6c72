//! Simulated delay used for checkpoint pacing and brewing.
//!
//! Pacing is purely observational: correctness never depends on how long a pause lasts,
//! so tests run with [`NoDelay`] while the binaries use [`ThreadSleep`].

use std::thread;
use std::time::Duration;

/// Source of simulated delay.
pub trait Pacer: Send + Sync {
    /// Pause the calling worker for `duration` of simulated work.
    fn pause(&self, duration: Duration);
}

/// Pauses by sleeping the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Returns immediately; no real time passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&self, _duration: Duration) {}
}
