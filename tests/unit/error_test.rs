//! Tests for error types

use admission_lot::core::{AppResult, SimError};

#[test]
fn test_configuration_error() {
    let err = SimError::Configuration("missing key N".to_string());
    assert_eq!(format!("{}", err), "configuration error: missing key N");
}

#[test]
fn test_interrupted_wait_error() {
    let err = SimError::interrupted("MAC-3");
    assert_eq!(format!("{}", err), "wait interrupted: MAC-3");
    assert!(err.is_interrupted());
}

#[test]
fn test_invariant_violation_error() {
    let err = SimError::InvariantViolation("two holders".to_string());
    assert_eq!(format!("{}", err), "invariant violation: two holders");
    assert!(!err.is_interrupted());
}

#[test]
fn test_worker_errors() {
    assert_eq!(
        SimError::WorkerPanicked("client-H1".into()).to_string(),
        "worker panicked: client-H1"
    );
    assert_eq!(
        SimError::Spawn("mac-1: out of threads".into()).to_string(),
        "failed to spawn worker: mac-1: out of threads"
    );
}

#[test]
fn test_error_converts_to_app_result() {
    fn fails() -> AppResult<()> {
        let outcome: Result<(), SimError> = Err(SimError::interrupted("C2"));
        outcome?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert_eq!(
        err.downcast_ref::<SimError>(),
        Some(&SimError::interrupted("C2"))
    );
}
