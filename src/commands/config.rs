use anyhow::{Context, Result};
use colored::Colorize;

use super::{parse_profile, parse_range};
use crate::core::Config;

/// Settable configuration keys
enum ConfigKey {
    Profile,
    Range,
    Bridge,
    Probe,
    CacheTtl,
}

impl ConfigKey {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "profile" => Some(ConfigKey::Profile),
            "range" => Some(ConfigKey::Range),
            "bridge" => Some(ConfigKey::Bridge),
            "probe" => Some(ConfigKey::Probe),
            "cache-ttl" => Some(ConfigKey::CacheTtl),
            _ => None,
        }
    }

    fn apply(&self, config: &mut Config, value: &str) -> Result<()> {
        match self {
            ConfigKey::Profile => config.profile = parse_profile(value).map_err(anyhow::Error::msg)?,
            ConfigKey::Range => config.time_range = parse_range(value).map_err(anyhow::Error::msg)?,
            ConfigKey::Bridge => config.bridge.enabled = parse_switch(value)?,
            ConfigKey::Probe => config.probe.enabled = parse_switch(value)?,
            ConfigKey::CacheTtl => {
                config.cache_ttl_ms = value
                    .parse()
                    .with_context(|| format!("'{}' is not a number of milliseconds", value))?
            }
        }
        Ok(())
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => anyhow::bail!("expected on/off, got '{}'", value),
    }
}

pub fn handle(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
        Some(("set", sub_matches)) => set(sub_matches),
        _ => {
            println!("Use 'statbar config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn set(matches: &clap::ArgMatches) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;
    let value = matches
        .get_one::<String>("value")
        .context("Value argument is required")?;

    let config_key = ConfigKey::parse(key).with_context(|| {
        format!("Unknown key '{}' (profile, range, bridge, probe, cache-ttl)", key)
    })?;

    let mut config = Config::load()?;
    config_key.apply(&mut config, value)?;
    config.save()?;

    println!("{}", format!("✓ {} set to {}", key, value).green());
    Ok(())
}
