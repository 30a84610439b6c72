//! Integration tests for `FairGate`
//!
//! These tests verify mutual exclusion and FIFO hand-off under real thread contention.

use admission_lot::core::SimError;
use admission_lot::FairGate;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn wait_for_waiters(gate: &FairGate, waiting: usize) {
    for _ in 0..1000 {
        if gate.stats().waiting == waiting {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("gate never reached {waiting} waiters");
}

/// Waiters that queued one after another are admitted in that order
#[test]
fn test_fifo_hand_off() {
    const WAITERS: usize = 8;

    let gate = Arc::new(FairGate::new());
    let admitted = Arc::new(Mutex::new(Vec::new()));
    let guard = gate.acquire().unwrap();

    let mut handles = Vec::new();
    for i in 0..WAITERS {
        let waiter_gate = Arc::clone(&gate);
        let admitted = Arc::clone(&admitted);
        handles.push(thread::spawn(move || {
            let _guard = waiter_gate.acquire_for(&format!("MAC-{i}")).unwrap();
            admitted.lock().push(i);
        }));
        // queue strictly one at a time so arrival order is known
        wait_for_waiters(&gate, i + 1);
    }

    drop(guard);
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*admitted.lock(), (0..WAITERS).collect::<Vec<_>>());
    let stats = gate.stats();
    assert_eq!(stats.acquisitions, WAITERS as u64 + 1);
    assert_eq!(stats.contended, WAITERS as u64);
}

/// Never more than one thread inside, and every attempt eventually gets in
#[test]
fn test_mutual_exclusion_under_contention() {
    const THREADS: usize = 16;
    const ROUNDS: usize = 200;

    let gate = Arc::new(FairGate::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let guard = gate.acquire().unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                    guard.release();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(gate.stats().acquisitions, (THREADS * ROUNDS) as u64);
    assert!(!gate.stats().held);
}

/// Shutdown releases every queued waiter with `InterruptedWait`
#[test]
fn test_shutdown_unblocks_all_waiters() {
    let gate = Arc::new(FairGate::new());
    let guard = gate.acquire().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.acquire_for(&format!("MAC-{i}")).map(|_| ()))
        })
        .collect();
    wait_for_waiters(&gate, 4);

    gate.shutdown();
    for handle in handles {
        let err = handle.join().unwrap().unwrap_err();
        assert!(err.is_interrupted());
    }
    drop(guard);

    assert!(matches!(
        gate.acquire_for("MAC-late"),
        Err(SimError::InterruptedWait { .. })
    ));
}
