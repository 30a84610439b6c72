//! Dispenser station integration tests
//!
//! These tests drive the station monitor from several threads and check mode
//! exclusivity, capacity, dispenser numbering, the logical clock, and liveness.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use admission_lot::builders::SimulationBuilder;
use admission_lot::config::{ClientSpec, PacingConfig, StationConfig};
use admission_lot::core::{
    Client, DispenserStation, InMemoryEventSink, SimError, SimEvent, StationMode, StationSnapshot,
    Temperature, DISPENSER_COUNT,
};
use rand::Rng;

fn client(id: &str, brew: u32) -> Client {
    Client::new(id, brew, 0).unwrap()
}

fn wait_until(station: &DispenserStation, what: &str, done: impl Fn(&StationSnapshot) -> bool) {
    for _ in 0..1000 {
        if done(&station.snapshot()) {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("station never reached: {what}");
}

/// Replays the event stream, checking every admission against the station rules.
fn replay(events: &[SimEvent]) -> usize {
    let mut occupants: [Option<(String, Temperature)>; DISPENSER_COUNT] = Default::default();
    let mut mode = StationMode::Idle;
    let mut served = 0;
    let mut last_clock = 0;

    for event in events {
        match event {
            SimEvent::ModeChanged { mode: next } => {
                assert!(
                    occupants.iter().all(Option::is_none),
                    "mode changed to {next} while dispensers were occupied"
                );
                mode = *next;
            }
            SimEvent::DispenserAssigned {
                at,
                client,
                dispenser,
                ..
            } => {
                let temperature = Temperature::from_client_id(client).unwrap();
                assert_eq!(mode, StationMode::from(Some(temperature)), "{client} admitted in {mode}");
                let lowest_free = occupants.iter().position(Option::is_none).unwrap() + 1;
                assert_eq!(*dispenser, lowest_free, "{client} skipped a lower dispenser");
                assert!(occupants
                    .iter()
                    .flatten()
                    .all(|(_, other)| *other == temperature));
                assert_eq!(*at, last_clock);
                occupants[dispenser - 1] = Some((client.clone(), temperature));
            }
            SimEvent::DispenserFreed {
                at,
                client,
                dispenser,
            } => {
                let (holder, _) = occupants[dispenser - 1].take().unwrap();
                assert_eq!(&holder, client);
                assert!(*at >= last_clock);
                last_clock = *at;
                served += 1;
            }
            _ => {}
        }
    }
    assert!(occupants.iter().all(Option::is_none));
    served
}

/// H1 holds a dispenser, C1 waits, H2 joins H1; C1 gets in only after both hot clients left
#[test]
fn test_mode_exclusivity_scenario() {
    let sink = Arc::new(InMemoryEventSink::new(256));
    let station = Arc::new(DispenserStation::new(sink.clone()));

    let h1 = station.request(&client("H1", 2)).unwrap();
    assert_eq!(h1.dispenser(), 1);

    let cold = {
        let station = Arc::clone(&station);
        thread::spawn(move || {
            let ticket = station.request(&client("C1", 2))?;
            let dispenser = ticket.dispenser();
            let started_at = ticket.started_at();
            station.release(ticket)?;
            Ok::<_, SimError>((dispenser, started_at))
        })
    };
    wait_until(&station, "C1 waiting", |s| s.cold_waiting == 1);

    let h2 = station.request(&client("H2", 1)).unwrap();
    assert_eq!(h2.dispenser(), 2);
    let snapshot = station.snapshot();
    assert_eq!(snapshot.mode, StationMode::Hot);
    assert_eq!(snapshot.occupied(), 2);
    assert_eq!(snapshot.cold_waiting, 1);

    station.release(h1).unwrap();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(station.snapshot().cold_waiting, 1, "C1 admitted while H2 was brewing");

    station.release(h2).unwrap();
    let (dispenser, started_at) = cold.join().unwrap().unwrap();
    assert_eq!(dispenser, 1);
    assert_eq!(started_at, 2);

    let snapshot = station.snapshot();
    assert_eq!(snapshot.mode, StationMode::Idle);
    assert_eq!(snapshot.occupied(), 0);
    assert_eq!(snapshot.hot_waiting + snapshot.cold_waiting, 0);
    assert_eq!(snapshot.served, 3);
    assert_eq!(station.await_all_idle(), 4);

    let lines: Vec<String> = sink.events().iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "station mode: hot",
            "(0) H1 uses dispenser 1 (time: 2)",
            "(0) H2 uses dispenser 2 (time: 1)",
            "(2) H1 leaves dispenser 1",
            "(2) H2 leaves dispenser 2",
            "station mode: cold",
            "(2) C1 uses dispenser 1 (time: 2)",
            "(4) C1 leaves dispenser 1",
            "station mode: idle",
        ]
    );
}

/// A full station never over-admits: the fourth hot client waits for a free dispenser
#[test]
fn test_capacity_bound() {
    let station = Arc::new(DispenserStation::new(Arc::new(InMemoryEventSink::new(64))));
    let tickets: Vec<_> = (1..=DISPENSER_COUNT)
        .map(|i| station.request(&client(&format!("H{i}"), 1)).unwrap())
        .collect();

    let fourth = {
        let station = Arc::clone(&station);
        thread::spawn(move || {
            let ticket = station.request(&client("H4", 1))?;
            let dispenser = ticket.dispenser();
            station.release(ticket)?;
            Ok::<_, SimError>(dispenser)
        })
    };
    wait_until(&station, "H4 waiting", |s| s.hot_waiting == 1);
    assert_eq!(station.snapshot().occupied(), DISPENSER_COUNT);

    let mut tickets = tickets.into_iter();
    station.release(tickets.next().unwrap()).unwrap();
    // H4 takes the dispenser H1 left, not the next in line
    assert_eq!(fourth.join().unwrap().unwrap(), 1);
    for ticket in tickets {
        station.release(ticket).unwrap();
    }
    assert_eq!(station.snapshot().served, DISPENSER_COUNT + 1);
}

/// With both classes queued when the station drains, the class that arrived first wins
#[test]
fn test_drained_station_goes_to_earliest_arrival() {
    let sink = Arc::new(InMemoryEventSink::new(64));
    let station = Arc::new(DispenserStation::with_capacity(1, sink.clone()).unwrap());
    let h1 = station.request(&client("H1", 1)).unwrap();

    let spawn_client = |id: &'static str| {
        let station = Arc::clone(&station);
        thread::spawn(move || {
            let ticket = station.request(&client(id, 1))?;
            station.release(ticket)
        })
    };
    let c1 = spawn_client("C1");
    wait_until(&station, "C1 waiting", |s| s.cold_waiting == 1);
    // H2 queues behind C1 even though the station is still hot
    let h2 = spawn_client("H2");
    wait_until(&station, "H2 waiting", |s| s.hot_waiting == 1);

    station.release(h1).unwrap();
    c1.join().unwrap().unwrap();
    h2.join().unwrap().unwrap();

    let events = sink.events();
    let admitted: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            SimEvent::DispenserAssigned { client, .. } => Some(client.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(admitted, vec!["H1", "C1", "H2"]);

    let modes: Vec<StationMode> = events
        .iter()
        .filter_map(|event| match event {
            SimEvent::ModeChanged { mode } => Some(*mode),
            _ => None,
        })
        .collect();
    assert_eq!(
        modes,
        vec![
            StationMode::Hot,
            StationMode::Cold,
            StationMode::Hot,
            StationMode::Idle
        ]
    );
    assert_eq!(replay(&events), 3);
}

/// Randomized mix of hot and cold clients: every rule holds and everybody is served
#[test]
fn test_randomized_run_keeps_invariants() {
    const CLIENTS: usize = 40;

    let mut rng = rand::rng();
    let mut hot = 0;
    let mut cold = 0;
    let clients = (0..CLIENTS)
        .map(|_| {
            let id = if rng.random_bool(0.5) {
                hot += 1;
                format!("H{hot}")
            } else {
                cold += 1;
                format!("C{cold}")
            };
            ClientSpec {
                id,
                brew: rng.random_range(1..=4),
            }
        })
        .collect();
    let config = StationConfig { clients };
    let expected_total: u64 = config.clients.iter().map(|spec| u64::from(spec.brew)).sum();

    let sink = Arc::new(InMemoryEventSink::new(10_000));
    let pacing = PacingConfig {
        brew_unit_ms: 1,
        ..PacingConfig::instant()
    };
    let sim = SimulationBuilder::new(pacing)
        .with_events(sink.clone())
        .build_station(config)
        .unwrap();
    let report = sim.run().unwrap();

    assert_eq!(report.served, CLIENTS);
    assert!(report.finished_at > 0);
    assert!(report.finished_at <= expected_total);

    let events = sink.events();
    assert_eq!(replay(&events), CLIENTS);
    assert_eq!(
        events.last(),
        Some(&SimEvent::RunCompleted {
            at: Some(report.finished_at)
        })
    );

    let snapshot = sim.station().snapshot();
    assert_eq!(snapshot.mode, StationMode::Idle);
    assert_eq!(snapshot.brewing, 0);
    assert_eq!(snapshot.clock, report.finished_at);
}

/// Every client ends up at a dispenser, and each is served exactly once
#[test]
fn test_every_client_served_once() {
    let sink = Arc::new(InMemoryEventSink::new(1024));
    let config =
        StationConfig::from_input_str("6\nH1 1\nC1 2\nH2 1\nC2 1\nC3 3\nH3 2\n").unwrap();
    let sim = SimulationBuilder::new(PacingConfig::instant())
        .with_events(sink.clone())
        .build_station(config)
        .unwrap();
    sim.run().unwrap();

    let served: BTreeSet<String> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SimEvent::DispenserFreed { client, .. } => Some(client),
            _ => None,
        })
        .collect();
    let expected: BTreeSet<String> = ["H1", "C1", "H2", "C2", "C3", "H3"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(served, expected);
}

/// Shutdown releases a blocked client with `InterruptedWait` and leaves brewers alone
#[test]
fn test_shutdown_interrupts_waiting_client() {
    let station = Arc::new(DispenserStation::new(Arc::new(InMemoryEventSink::new(64))));
    let h1 = station.request(&client("H1", 1)).unwrap();

    let cold = {
        let station = Arc::clone(&station);
        thread::spawn(move || station.request(&client("C1", 1)).map(|ticket| ticket.dispenser()))
    };
    wait_until(&station, "C1 waiting", |s| s.cold_waiting == 1);

    station.shutdown();
    assert_eq!(cold.join().unwrap().unwrap_err(), SimError::interrupted("C1"));
    assert_eq!(station.snapshot().cold_waiting, 0);

    station.release(h1).unwrap();
    let snapshot = station.snapshot();
    assert_eq!(snapshot.mode, StationMode::Idle);
    assert_eq!(snapshot.served, 1);
    assert_eq!(station.await_all_idle_for(Duration::from_millis(10)), Some(1));
}
