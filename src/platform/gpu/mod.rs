//! Accelerator busy percentage.
//!
//! Supports NVIDIA (via NVML), any Linux DRM driver exposing
//! `gpu_busy_percent` (amdgpu, i915 via xe), and the macOS IOAccelerator
//! statistics.

mod drm;
mod ioreg;
mod nvidia;

pub use drm::{parse_busy_percent, DrmGpuProvider};
pub use ioreg::{parse_device_utilization, IoregGpuProvider};
pub use nvidia::NvidiaGpuProvider;

use crate::error::Result;

/// One accelerator that can report how busy it is.
pub trait GpuProvider: Send {
    fn name(&self) -> &str;

    /// Busy share over the driver's last sampling window, 0-100.
    fn busy_percent(&mut self) -> Result<f64>;
}

/// Attempt to get an available GPU provider
///
/// Tries each source in order of preference:
/// 1. NVIDIA (via NVML)
/// 2. DRM sysfs
/// 3. IOAccelerator statistics
pub fn get_gpu_provider() -> Option<Box<dyn GpuProvider>> {
    match NvidiaGpuProvider::new() {
        Ok(provider) => return Some(Box::new(provider)),
        Err(e) => log::debug!("NVML unavailable: {}", e),
    }

    if let Some(provider) = DrmGpuProvider::detect() {
        return Some(Box::new(provider));
    }

    if let Some(provider) = IoregGpuProvider::detect() {
        return Some(Box::new(provider));
    }

    None
}
