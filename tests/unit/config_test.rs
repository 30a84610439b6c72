//! Tests for configuration parsing and validation

use admission_lot::config::{CrossingConfig, PacingConfig, StationConfig};
use admission_lot::core::{Route, SimError};

#[test]
fn test_crossing_config_validation() {
    let valid = CrossingConfig {
        csr1: 1,
        csr2: 0,
        ed1: 0,
        ed2: 0,
        repetitions: 0,
    };
    assert!(valid.validate().is_ok());

    let invalid = CrossingConfig { csr1: 0, ..valid };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_crossing_config_from_input() {
    let cfg = CrossingConfig::from_input_str("CSR1=2, CSR2=0, ED1=1, ED2=3, N=4").unwrap();
    assert_eq!(cfg.cart_count(), 6);
    assert_eq!(cfg.total_crossings(), 24);
    assert_eq!(cfg.route_counts()[&Route::Ed2ToCsr2], 3);

    let ids: Vec<u32> = cfg.carts().iter().map(|cart| cart.id()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_crossing_config_missing_key() {
    let err = CrossingConfig::from_input_str("CSR1=2, CSR2=0, ED1=1, N=4").unwrap_err();
    assert_eq!(err, SimError::Configuration("missing key ED2".into()));
}

#[test]
fn test_station_config_from_input() {
    let cfg = StationConfig::from_input_str("2\nC1 5\nH1 2\n").unwrap();
    let clients = cfg.clients().unwrap();
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].id(), "C1");
    assert_eq!(clients[0].brew(), 5);
    assert_eq!(clients[1].position(), 1);
}

#[test]
fn test_station_config_short_listing() {
    let err = StationConfig::from_input_str("3\nC1 5\nH1 2\n").unwrap_err();
    assert_eq!(
        err,
        SimError::Configuration("expected 3 clients, found 2".into())
    );
}

#[test]
fn test_station_config_from_json() {
    let json = r#"{ "clients": [ { "id": "H1", "brew": 3 } ] }"#;
    let cfg = StationConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.clients[0].brew, 3);

    let duplicate = r#"{ "clients": [ { "id": "H1", "brew": 3 }, { "id": "H1", "brew": 1 } ] }"#;
    assert!(StationConfig::from_json_str(duplicate).is_err());
}

#[test]
fn test_pacing_config_validation() {
    assert!(PacingConfig::default().validate().is_ok());
    let invalid = PacingConfig {
        checkpoint_count: 0,
        ..PacingConfig::default()
    };
    assert!(invalid.validate().is_err());
}
