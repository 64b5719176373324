//! Sensor diagnostics: which sources are reachable and what each tier
//! reports right now.

use std::sync::Arc;

use anyhow::Result;
use clap::ArgMatches;
use colored::*;

use super::load_config;
use crate::core::sampler::aggregator::SampleAggregator;
use crate::core::sampler::clock::SystemClock;
use crate::core::sampler::temperature::TempKind;
use crate::platform::elevation::is_elevated;
use crate::platform::get_gpu_provider;
use crate::ui::formatters::{format_bridge_status, format_temperature};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let mut aggregator = SampleAggregator::from_config(&config, Arc::new(SystemClock))?;

    println!("\n{}", "SENSOR SOURCES".bold().bright_cyan());
    println!("{}", "=".repeat(40));

    println!("  Elevated:     {}", if is_elevated() { "yes" } else { "no" });
    match get_gpu_provider() {
        Some(gpu) => println!("  Accelerator:  {}", gpu.name()),
        None => println!("  Accelerator:  {}", "none (CPU usage stands in)".dimmed()),
    }

    let tiers: Vec<String> = aggregator
        .estimator()
        .tier_sources()
        .iter()
        .map(|s| format!("{:?}", s))
        .collect();
    println!("  Temp tiers:   {}", tiers.join(" > "));

    let sample = aggregator.tick();
    println!("  Bridge:       {}", format_bridge_status(aggregator.bridge_status()));

    println!("\n{}", "Current readings".bold().green());
    for (kind, reading) in [
        (TempKind::Cpu, sample.cpu_temp),
        (TempKind::Gpu, sample.gpu_temp),
        (TempKind::Disk, sample.disk_temp),
    ] {
        let text = match reading {
            Some(r) => format!("{} via {:?}", format_temperature(&r), r.source),
            None => "--".dimmed().to_string(),
        };
        println!("  {:<12}  {}", format!("{:?}", kind), text);
    }
    match sample.fan_rpm {
        Some(rpm) => println!("  {:<12}  {:.0} RPM", "Fans", rpm),
        None => println!("  {:<12}  {}", "Fans", "--".dimmed()),
    }

    Ok(())
}
