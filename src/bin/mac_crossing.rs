//! Intersection simulation: supply carts cross a shared single-lane intersection.
//!
//! Reads one line `CSR1=a, CSR2=b, ED1=c, ED2=d, N=n` from the input file and prints
//! every cart's progress and the trail totals after each crossing.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;

use admission_lot::builders::SimulationBuilder;
use admission_lot::config::{CrossingConfig, PacingConfig};
use admission_lot::core::{AppResult, ChannelEventSink, SimEvent};
use admission_lot::util::init_tracing;

#[derive(Parser)]
#[command(name = "mac_crossing")]
#[command(about = "Simulate supply carts crossing a shared intersection")]
struct Cli {
    /// Input file with the cart counts and repetitions
    input: PathBuf,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing("warn");

    let input = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let config = CrossingConfig::from_input_str(&input)?;
    let pacing = PacingConfig::from_env().map_err(|e| anyhow!(e))?;

    let (sink, rx) = ChannelEventSink::unbounded();
    let reporter = thread::Builder::new()
        .name("reporter".into())
        .spawn(move || {
            for event in rx {
                if !matches!(event, SimEvent::RunCompleted { .. }) {
                    println!("{event}");
                }
            }
        })
        .context("failed to spawn reporter")?;

    let sim = SimulationBuilder::new(pacing)
        .with_events(Arc::new(sink))
        .build_crossing(config)?;
    let outcome = sim.run();
    drop(sim);
    reporter
        .join()
        .map_err(|_| anyhow!("reporter thread panicked"))?;

    outcome?;
    Ok(())
}
