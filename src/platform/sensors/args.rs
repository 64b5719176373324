use serde::{Deserialize, Serialize};

use crate::error::{Result, StatbarError};

/// Maximum number of arguments forwarded to the privileged peer
pub const MAX_BRIDGE_ARGS: usize = 20;

/// Longest single argument accepted
const MAX_ARG_LEN: usize = 64;

/// Flags the privileged sampler understands
const ALLOWED_FLAGS: &[&str] = &[
    "--samplers",
    "-s",
    "--sample-count",
    "-n",
    "--sample-rate",
    "-i",
    "--show-all",
];

/// Sampler names that may appear (alone or comma-joined) after `--samplers`
const ALLOWED_SAMPLERS: &[&str] = &[
    "smc",
    "thermal",
    "cpu_power",
    "gpu_power",
    "battery",
    "ane_power",
];

/// Characters that are never forwarded, whatever the token
const FORBIDDEN_CHARS: &[char] = &[
    '/',  // Path separator
    '\\', // Windows path separator / escapes
    ';',  // Command separator
    '|',  // Pipe
    '&',  // Background/AND
    '$',  // Variable expansion
    '`',  // Command substitution
    '\n', // Newline
    '\r', // Carriage return
    '\0', // Null byte
];

/// A validated argument list for the privileged sensor peer.
///
/// Only constructible through [`BridgeArgs::new`], so holding one means every
/// token passed the whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeArgs(Vec<String>);

impl BridgeArgs {
    pub fn new<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        validate_bridge_args(&args)?;
        Ok(Self(args))
    }

    /// Single sample of the given samplers at `interval_ms`.
    pub fn sample(samplers: &[&str], count: u32, interval_ms: u32) -> Result<Self> {
        Self::new([
            "--samplers".to_string(),
            samplers.join(","),
            "-n".to_string(),
            count.to_string(),
            "-i".to_string(),
            interval_ms.to_string(),
        ])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Validate an argument list against the whitelist.
///
/// Every token must be an allowed flag, a (comma-joined) list of allowed
/// sampler names, or a plain unsigned number.
pub fn validate_bridge_args(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err(StatbarError::invalid_bridge_args("argument list is empty"));
    }

    if args.len() > MAX_BRIDGE_ARGS {
        return Err(StatbarError::invalid_bridge_args(format!(
            "too many arguments ({}, max {})",
            args.len(),
            MAX_BRIDGE_ARGS
        )));
    }

    for arg in args {
        validate_token(arg)?;
    }

    Ok(())
}

fn validate_token(arg: &str) -> Result<()> {
    if arg.is_empty() {
        return Err(StatbarError::invalid_bridge_args("empty argument"));
    }

    if arg.len() > MAX_ARG_LEN {
        return Err(StatbarError::invalid_bridge_args(format!(
            "argument too long ({} chars, max {})",
            arg.len(),
            MAX_ARG_LEN
        )));
    }

    if let Some(ch) = arg.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(StatbarError::invalid_bridge_args(format!(
            "argument '{}' contains forbidden character '{}'",
            arg.escape_default(),
            ch.escape_default()
        )));
    }

    if arg.contains("..") {
        return Err(StatbarError::invalid_bridge_args(format!(
            "argument '{}' contains '..'",
            arg
        )));
    }

    if ALLOWED_FLAGS.contains(&arg) || is_number(arg) || is_sampler_list(arg) {
        return Ok(());
    }

    Err(StatbarError::invalid_bridge_args(format!(
        "argument '{}' is not in the allowed set",
        arg
    )))
}

fn is_number(arg: &str) -> bool {
    arg.len() <= 7 && arg.chars().all(|c| c.is_ascii_digit())
}

fn is_sampler_list(arg: &str) -> bool {
    arg.split(',').all(|name| ALLOWED_SAMPLERS.contains(&name))
}
