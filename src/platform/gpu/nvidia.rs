#[cfg(feature = "nvml")]
use nvml_wrapper::{Device, Nvml};

use super::GpuProvider;
use crate::error::{Result, StatbarError};

/// NVIDIA GPU provider using NVML
pub struct NvidiaGpuProvider {
    #[cfg(feature = "nvml")]
    nvml: Nvml,
    device_index: u32,
    name: String,
}

impl NvidiaGpuProvider {
    /// Initializes NVML and selects the first GPU.
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    pub fn with_device_index(index: u32) -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init()
                .map_err(|e| StatbarError::unsupported(format!("Failed to init NVML: {}", e)))?;

            let name = nvml
                .device_by_index(index)
                .map_err(|e| StatbarError::unsupported(format!("GPU {} not found: {}", index, e)))?
                .name()
                .unwrap_or_else(|_| "NVIDIA GPU".to_string());

            Ok(Self {
                nvml,
                device_index: index,
                name,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = index;
            Err(StatbarError::unsupported("NVIDIA GPU support not enabled"))
        }
    }

    #[cfg(feature = "nvml")]
    fn get_device(&self) -> Result<Device<'_>> {
        self.nvml
            .device_by_index(self.device_index)
            .map_err(|e| StatbarError::runtime(format!("Failed to get GPU device: {}", e)))
    }
}

impl GpuProvider for NvidiaGpuProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn busy_percent(&mut self) -> Result<f64> {
        #[cfg(feature = "nvml")]
        {
            let device = self.get_device()?;
            let rates = device
                .utilization_rates()
                .map_err(|e| StatbarError::runtime(format!("NVML utilization: {}", e)))?;
            Ok(rates.gpu as f64)
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = self.device_index;
            Err(StatbarError::unsupported("NVIDIA GPU support not enabled"))
        }
    }
}
