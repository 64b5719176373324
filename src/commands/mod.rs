// Command handlers module
pub mod config;
pub mod monitor;
pub mod sensors;
pub mod snapshot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::config::Config;
use crate::core::sampler::aggregator::SampleAggregator;
use crate::core::sampler::clock::SystemClock;
use crate::core::sampler::model::TimeRange;
use crate::core::sampler::scheduler::{Profile, SamplingEngine};

/// Config from `--config` if given, else the user config directory.
pub fn load_config(matches: &ArgMatches) -> Result<Config> {
    match matches.try_get_one::<PathBuf>("config").ok().flatten() {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Engine built from `config`, with `--profile`, `--range` and `--interval`
/// taking precedence when the subcommand defines them.
pub fn engine_from_matches(config: &Config, matches: &ArgMatches) -> Result<SamplingEngine> {
    let profile = matches
        .try_get_one::<Profile>("profile")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(config.profile);
    let range = matches
        .try_get_one::<TimeRange>("range")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(config.time_range);
    let interval = matches
        .try_get_one::<Duration>("interval")
        .ok()
        .flatten()
        .copied()
        .unwrap_or_else(|| profile.interval());

    let aggregator = SampleAggregator::from_config(config, Arc::new(SystemClock))
        .context("Failed to set up the sampler")?;
    Ok(SamplingEngine::new(aggregator, range, interval, config.published_points))
}

pub fn parse_profile(value: &str) -> std::result::Result<Profile, String> {
    Profile::parse(value).ok_or_else(|| format!("unknown profile '{}' (eco, balanced, performance)", value))
}

pub fn parse_range(value: &str) -> std::result::Result<TimeRange, String> {
    TimeRange::parse(value).ok_or_else(|| format!("unknown range '{}' (5m, 1h, 24h)", value))
}
