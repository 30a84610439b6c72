//! Tests for event rendering and sinks

use admission_lot::core::{
    Cargo, EventSink, InMemoryEventSink, Location, NullEventSink, SimEvent, StationMode,
};

#[test]
fn test_crossing_event_lines() {
    let waiting = SimEvent::CartWaiting {
        cart: 2,
        cargo: Cargo::Stock,
        destination: Location::Ed2,
    };
    assert_eq!(
        waiting.to_string(),
        "MAC-2 (Stock): Waiting at the Intersection. Going towards ED2"
    );
    assert_eq!(
        SimEvent::TrailTotals {
            trail1: 3,
            trail2: 5
        }
        .to_string(),
        "Total crossed in Trail1: 3 Trail2: 5"
    );
}

#[test]
fn test_station_event_lines() {
    let assigned = SimEvent::DispenserAssigned {
        at: 7,
        client: "C4".into(),
        dispenser: 3,
        brew: 2,
    };
    assert_eq!(assigned.to_string(), "(7) C4 uses dispenser 3 (time: 2)");
    assert_eq!(
        SimEvent::ModeChanged {
            mode: StationMode::Cold
        }
        .to_string(),
        "station mode: cold"
    );
    assert_eq!(SimEvent::RunCompleted { at: Some(9) }.to_string(), "(9) DONE");
}

#[test]
fn test_event_json_round_trip() {
    let event = SimEvent::CartFinished { cart: 4 };
    let json = serde_json::to_string(&event).unwrap();
    assert_eq!(json, r#"{"kind":"cart_finished","cart":4}"#);
    let parsed: SimEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn test_sinks() {
    NullEventSink.record(SimEvent::CartFinished { cart: 1 });

    let sink = InMemoryEventSink::new(8);
    sink.record(SimEvent::CartFinished { cart: 1 });
    assert_eq!(sink.events().len(), 1);
}
