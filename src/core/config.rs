use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::sampler::model::TimeRange;
use crate::core::sampler::scheduler::Profile;
use crate::core::sampler::temperature::DEFAULT_TEMP_CACHE_TTL;
use crate::platform::sensors::bridge::DEFAULT_BRIDGE_TIMEOUT;
use crate::platform::sensors::probe::DEFAULT_PROBE_TIMEOUT;

/// Points per series handed to consumers on each snapshot
pub const DEFAULT_PUBLISHED_POINTS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: Profile,
    pub time_range: TimeRange,
    /// Lifetime of cached temperatures and bridge readings
    pub cache_ttl_ms: u64,
    pub probe: ProbeConfig,
    pub bridge: BridgeConfig,
    pub published_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            time_range: TimeRange::default(),
            cache_ttl_ms: DEFAULT_TEMP_CACHE_TTL.as_millis() as u64,
            probe: ProbeConfig::default(),
            bridge: BridgeConfig::default(),
            published_points: DEFAULT_PUBLISHED_POINTS,
        }
    }
}

/// Unprivileged external sensor tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "sensors".to_string(),
            args: Vec::new(),
            timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Privileged sensor peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,
    /// Peer socket; the built-in default when unset
    pub socket_path: Option<PathBuf>,
    pub timeout_ms: u64,
    pub samplers: Vec<String>,
    pub sample_count: u32,
    pub sample_interval_ms: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket_path: None,
            timeout_ms: DEFAULT_BRIDGE_TIMEOUT.as_millis() as u64,
            samplers: vec!["smc".to_string()],
            sample_count: 1,
            sample_interval_ms: 500,
        }
    }
}

impl BridgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load from the user config directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // If the file is empty or corrupted, return default config
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", config_path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("statbar").join("config.json"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn interval(&self) -> Duration {
        self.profile.interval()
    }
}
