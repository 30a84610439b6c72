//! Dispenser station simulation: hot and cold clients share three dispensers.
//!
//! Reads a client count followed by one `ID BREW` line per client and prints each
//! dispenser assignment stamped with logical time, then `(t) DONE`.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;

use admission_lot::builders::SimulationBuilder;
use admission_lot::config::{PacingConfig, StationConfig};
use admission_lot::core::{AppResult, ChannelEventSink, SimEvent};
use admission_lot::util::init_tracing;

#[derive(Parser)]
#[command(name = "coffee_station")]
#[command(about = "Simulate hot and cold clients sharing a dispenser station")]
struct Cli {
    /// Input file with the client count and one `ID BREW` line per client
    input: PathBuf,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing("warn");

    let input = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let config = StationConfig::from_input_str(&input)?;
    let pacing = PacingConfig::from_env().map_err(|e| anyhow!(e))?;

    let (sink, rx) = ChannelEventSink::unbounded();
    let reporter = thread::Builder::new()
        .name("reporter".into())
        .spawn(move || {
            for event in rx {
                if matches!(
                    event,
                    SimEvent::DispenserAssigned { .. } | SimEvent::RunCompleted { .. }
                ) {
                    println!("{event}");
                }
            }
        })
        .context("failed to spawn reporter")?;

    let sim = SimulationBuilder::new(pacing)
        .with_events(Arc::new(sink))
        .build_station(config)?;
    let outcome = sim.run();
    drop(sim);
    reporter
        .join()
        .map_err(|_| anyhow!("reporter thread panicked"))?;

    outcome?;
    Ok(())
}
