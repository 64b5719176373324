use std::time::Duration;

use crate::error::{Result, StatbarError};
use crate::platform::process::{is_available, run_checked};

/// Default budget for one probe run
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Unprivileged external sensor tool.
pub trait SensorProbe: Send {
    /// Raw text output of one run.
    fn run(&mut self) -> Result<String>;
}

/// Runs a configured command, e.g. `sensors` from lm-sensors.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// `None` when the program cannot be found, so the tier is skipped
    /// entirely instead of failing on every cache miss.
    pub fn detect(program: &str, args: Vec<String>, timeout: Duration) -> Option<Self> {
        if is_available(program) {
            Some(Self::new(program, args, timeout))
        } else {
            log::debug!("sensor probe '{}' not found on PATH", program);
            None
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SensorProbe for CommandProbe {
    fn run(&mut self) -> Result<String> {
        let text = run_checked(&self.program, &self.args, self.timeout)?;
        if text.trim().is_empty() {
            return Err(StatbarError::parse(format!("{} produced no output", self.program)));
        }
        Ok(text)
    }
}
