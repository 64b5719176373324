//! Live monitor command handler.
//!
//! Starts the background sampler and prints every published snapshot until
//! Ctrl+C or the requested number of snapshots.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use super::{engine_from_matches, load_config};
use crate::core::sampler::scheduler::{MetricSnapshot, SchedulerRuntime};
use crate::ui::formatters::print_snapshot;

/// Execute the monitor command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let json_output = matches.get_flag("json");
    let count = matches.get_one::<u64>("count").copied();

    let engine = engine_from_matches(&config, matches)?;
    let interval = engine.interval();
    let mut runtime = SchedulerRuntime::start(engine).context("Failed to start the sampler")?;

    // Setup Ctrl+C handler
    let shutdown_tx = runtime.shutdown_sender();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    if !json_output {
        println!(
            "{}",
            format!("Sampling every {:?}. Press Ctrl+C to stop.", interval).dimmed()
        );
    }

    let mut printed = 0u64;
    while let Some(snapshot) = runtime.wait_for_snapshot() {
        emit(&snapshot, json_output)?;
        printed += 1;
        if count.is_some_and(|n| printed >= n) {
            break;
        }
    }

    runtime.shutdown();
    Ok(())
}

fn emit(snapshot: &MetricSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        print_snapshot(snapshot);
    }
    Ok(())
}

/// Parse a `--interval` value in milliseconds.
pub fn parse_interval_ms(value: &str) -> std::result::Result<Duration, String> {
    let ms: u64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of milliseconds", value))?;
    if ms < 100 {
        return Err("interval must be at least 100 ms".to_string());
    }
    Ok(Duration::from_millis(ms))
}
