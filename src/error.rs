use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for the statbar sampler
#[derive(Error, Debug)]
pub enum StatbarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("{program} exited with status {exit_code}")]
    ProcessFailed { program: String, exit_code: i32 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Privileged sensor bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("Privileged sensor bridge refused connection: {0}")]
    BridgeUnauthorized(String),

    #[error("Invalid bridge arguments: {0}")]
    InvalidBridgeArgs(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(String),

    #[error("Sampler runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for statbar
pub type Result<T> = std::result::Result<T, StatbarError>;

impl StatbarError {
    /// Create a timeout error
    pub fn timeout<S: Into<String>>(what: S, after: Duration) -> Self {
        StatbarError::Timeout {
            what: what.into(),
            after,
        }
    }

    pub fn process_failed<S: Into<String>>(program: S, exit_code: i32) -> Self {
        StatbarError::ProcessFailed {
            program: program.into(),
            exit_code,
        }
    }

    pub fn parse<S: Into<String>>(msg: S) -> Self {
        StatbarError::Parse(msg.into())
    }

    pub fn bridge_unavailable<S: Into<String>>(msg: S) -> Self {
        StatbarError::BridgeUnavailable(msg.into())
    }

    pub fn bridge_unauthorized<S: Into<String>>(msg: S) -> Self {
        StatbarError::BridgeUnauthorized(msg.into())
    }

    pub fn invalid_bridge_args<S: Into<String>>(msg: S) -> Self {
        StatbarError::InvalidBridgeArgs(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        StatbarError::Unsupported(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        StatbarError::Runtime(msg.into())
    }

    /// Connection and authorization failures are surfaced to the consumer
    /// once; everything else is a per-tick degradation.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            StatbarError::BridgeUnavailable(_) | StatbarError::BridgeUnauthorized(_)
        )
    }
}
