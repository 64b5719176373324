use std::path::{Path, PathBuf};

use super::GpuProvider;
use crate::error::{Result, StatbarError};

const DRM_CLASS_DIR: &str = "/sys/class/drm";

/// GPU busy counter exposed by the kernel DRM driver.
pub struct DrmGpuProvider {
    busy_file: PathBuf,
    name: String,
}

impl DrmGpuProvider {
    pub fn detect() -> Option<Self> {
        Self::detect_in(Path::new(DRM_CLASS_DIR))
    }

    /// First `card*/device/gpu_busy_percent` under `root`.
    pub fn detect_in(root: &Path) -> Option<Self> {
        let mut cards: Vec<PathBuf> = std::fs::read_dir(root)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("card") && !n.contains('-'))
                    .unwrap_or(false)
            })
            .collect();
        cards.sort();

        cards.into_iter().find_map(|card| {
            let busy_file = card.join("device").join("gpu_busy_percent");
            busy_file.exists().then(|| Self {
                name: card
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                busy_file,
            })
        })
    }
}

impl GpuProvider for DrmGpuProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn busy_percent(&mut self) -> Result<f64> {
        let text = std::fs::read_to_string(&self.busy_file)?;
        parse_busy_percent(&text)
            .ok_or_else(|| StatbarError::parse(format!("{}: '{}'", self.busy_file.display(), text.trim())))
    }
}

pub fn parse_busy_percent(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value)
}
