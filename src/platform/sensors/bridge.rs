//! Client side of the privileged sensor peer.
//!
//! The peer is a long-lived elevated process that runs the sensor sampler on
//! our behalf and returns its exit code and raw text. We never reach hardware
//! through it directly; the text goes through [`parse_bridge_output`].
//!
//! Connection and authorization failures flip the client into
//! [`BridgeStatus::NoPrivilegedAccess`], which sticks until [`SensorBridgeClient::retry`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::args::BridgeArgs;
use super::parser::{parse_bridge_output, BridgeReading};
use crate::core::sampler::clock::Clock;
use crate::error::{Result, StatbarError};
use crate::platform::elevation::is_elevated;
use crate::platform::process::{is_available, run_with_timeout};

/// Default socket the peer listens on
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/statbar/sensors.sock";

/// Default budget for one bridge round trip
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(4);

/// Sampler run directly when we already hold privileges
pub const DIRECT_SAMPLER_PROGRAM: &str = "powermetrics";

/// Exit code and raw text of one privileged sampler run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOutput {
    pub exit_code: i32,
    pub output: String,
}

/// Transport to the privileged peer.
pub trait PrivilegedSensorBridge: Send {
    fn invoke(&mut self, args: &BridgeArgs) -> Result<BridgeOutput>;

    fn describe(&self) -> String;
}

/// One line of JSON sent to the peer.
#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub args: Vec<String>,
}

/// One line of JSON received from the peer.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BridgeResponse {
    Ok { exit_code: i32, output: String },
    /// Caller identity check failed
    Unauthorized { message: String },
    /// Peer-side argument validation failed
    Rejected { message: String },
}

impl BridgeResponse {
    fn into_output(self) -> Result<BridgeOutput> {
        match self {
            BridgeResponse::Ok { exit_code, output } => Ok(BridgeOutput { exit_code, output }),
            BridgeResponse::Unauthorized { message } => Err(StatbarError::bridge_unauthorized(message)),
            BridgeResponse::Rejected { message } => Err(StatbarError::invalid_bridge_args(message)),
        }
    }
}

/// Peer reached over a local Unix socket speaking JSON lines.
#[derive(Debug, Clone)]
pub struct SocketBridge {
    path: PathBuf,
    timeout: Duration,
}

impl SocketBridge {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }
}

#[cfg(unix)]
impl PrivilegedSensorBridge for SocketBridge {
    fn invoke(&mut self, args: &BridgeArgs) -> Result<BridgeOutput> {
        use std::io::{BufRead, BufReader, ErrorKind, Write};
        use std::os::unix::net::UnixStream;

        let mut stream = UnixStream::connect(&self.path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                StatbarError::bridge_unauthorized(format!("{}: {}", self.path.display(), e))
            }
            _ => StatbarError::bridge_unavailable(format!("{}: {}", self.path.display(), e)),
        })?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let request = BridgeRequest {
            args: args.as_slice().to_vec(),
        };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        stream.write_all(line.as_bytes())?;
        stream.flush()?;

        let mut reply = String::new();
        BufReader::new(&stream).read_line(&mut reply).map_err(|e| match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                StatbarError::timeout("privileged sensor bridge", self.timeout)
            }
            _ => StatbarError::Io(e),
        })?;

        // Peer closes without replying when it rejects our identity
        if reply.trim().is_empty() {
            return Err(StatbarError::bridge_unauthorized("peer closed the connection"));
        }

        serde_json::from_str::<BridgeResponse>(reply.trim())?.into_output()
    }

    fn describe(&self) -> String {
        format!("socket {}", self.path.display())
    }
}

#[cfg(not(unix))]
impl PrivilegedSensorBridge for SocketBridge {
    fn invoke(&mut self, _args: &BridgeArgs) -> Result<BridgeOutput> {
        Err(StatbarError::unsupported("privileged sensor socket requires Unix"))
    }

    fn describe(&self) -> String {
        format!("socket {}", self.path.display())
    }
}

/// Runs the sampler in-process when we are already elevated.
#[derive(Debug, Clone)]
pub struct DirectBridge {
    program: String,
    timeout: Duration,
}

impl DirectBridge {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl PrivilegedSensorBridge for DirectBridge {
    fn invoke(&mut self, args: &BridgeArgs) -> Result<BridgeOutput> {
        let out = run_with_timeout(&self.program, args.as_slice(), self.timeout)?;
        Ok(BridgeOutput {
            exit_code: out.exit_code,
            output: out.stdout,
        })
    }

    fn describe(&self) -> String {
        format!("direct {}", self.program)
    }
}

/// Pick a transport: the sampler directly when elevated, otherwise the peer
/// socket if it exists.
pub fn connect_default(socket_path: Option<PathBuf>, timeout: Duration) -> Option<Box<dyn PrivilegedSensorBridge>> {
    if is_elevated() && is_available(DIRECT_SAMPLER_PROGRAM) {
        log::debug!("elevated; running {} directly", DIRECT_SAMPLER_PROGRAM);
        return Some(Box::new(DirectBridge::new(DIRECT_SAMPLER_PROGRAM, timeout)));
    }

    let path = socket_path.unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH));
    if path.exists() {
        Some(Box::new(SocketBridge::new(path, timeout)))
    } else {
        log::debug!("no privileged sensor peer at {}", path.display());
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum BridgeStatus {
    /// No transport configured
    Disabled,
    /// Configured, no round trip yet
    Pending,
    Connected,
    /// Connection or authorization failed; sticky until retried
    NoPrivilegedAccess(String),
}

impl BridgeStatus {
    pub fn is_usable(&self) -> bool {
        matches!(self, BridgeStatus::Pending | BridgeStatus::Connected)
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeStatus::Disabled => write!(f, "disabled"),
            BridgeStatus::Pending => write!(f, "pending"),
            BridgeStatus::Connected => write!(f, "connected"),
            BridgeStatus::NoPrivilegedAccess(reason) => write!(f, "no privileged access ({})", reason),
        }
    }
}

/// Stateful, TTL-cached front for a [`PrivilegedSensorBridge`].
pub struct SensorBridgeClient {
    bridge: Option<Box<dyn PrivilegedSensorBridge>>,
    args: BridgeArgs,
    status: BridgeStatus,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    cached: Option<(Instant, Option<BridgeReading>)>,
}

impl SensorBridgeClient {
    pub fn new(
        bridge: Option<Box<dyn PrivilegedSensorBridge>>,
        args: BridgeArgs,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let status = if bridge.is_some() {
            BridgeStatus::Pending
        } else {
            BridgeStatus::Disabled
        };
        Self {
            bridge,
            args,
            status,
            ttl,
            clock,
            cached: None,
        }
    }

    /// A client with no transport; every read is `None`.
    pub fn disabled(clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::new(None, BridgeArgs::sample(&["smc"], 1, 1000)?, Duration::ZERO, clock))
    }

    pub fn status(&self) -> &BridgeStatus {
        &self.status
    }

    /// Latest reading, re-invoking the peer at most once per TTL.
    pub fn read(&mut self) -> Option<BridgeReading> {
        if !self.status.is_usable() {
            return None;
        }

        let now = self.clock.now();
        if let Some((at, reading)) = &self.cached {
            if now.saturating_duration_since(*at) < self.ttl {
                return reading.clone();
            }
        }

        let reading = self.invoke_once();
        if self.status.is_usable() {
            self.cached = Some((now, reading.clone()));
        }
        reading
    }

    fn invoke_once(&mut self) -> Option<BridgeReading> {
        let bridge = self.bridge.as_mut()?;

        match bridge.invoke(&self.args) {
            Ok(out) if out.exit_code != 0 => {
                self.status = BridgeStatus::Connected;
                log::debug!("privileged sampler exited with {}", out.exit_code);
                None
            }
            Ok(out) => {
                self.status = BridgeStatus::Connected;
                let reading = parse_bridge_output(&out.output);
                if reading.is_empty() {
                    log::debug!("privileged sampler output had no usable readings");
                    None
                } else {
                    Some(reading)
                }
            }
            Err(e) if e.is_connection_failure() => {
                log::warn!("Privileged sensors unavailable via {}: {}", bridge.describe(), e);
                self.status = BridgeStatus::NoPrivilegedAccess(e.to_string());
                self.cached = None;
                None
            }
            Err(e) => {
                log::debug!("privileged sampler failed: {}", e);
                None
            }
        }
    }

    /// Explicit user action: leave the sticky failure state.
    pub fn retry(&mut self) {
        if self.bridge.is_some() {
            log::info!("Retrying privileged sensor bridge");
            self.status = BridgeStatus::Pending;
            self.cached = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sampler::clock::ManualClock;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBridge {
        replies: VecDeque<Result<BridgeOutput>>,
        calls: Arc<AtomicUsize>,
    }

    impl PrivilegedSensorBridge for ScriptedBridge {
        fn invoke(&mut self, _args: &BridgeArgs) -> Result<BridgeOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(StatbarError::bridge_unavailable("script exhausted")))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn ok(text: &str) -> Result<BridgeOutput> {
        Ok(BridgeOutput {
            exit_code: 0,
            output: text.to_string(),
        })
    }

    fn client(replies: Vec<Result<BridgeOutput>>, clock: &ManualClock) -> (SensorBridgeClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let bridge = ScriptedBridge {
            replies: replies.into(),
            calls: calls.clone(),
        };
        let client = SensorBridgeClient::new(
            Some(Box::new(bridge)),
            BridgeArgs::sample(&["smc"], 1, 1000).unwrap(),
            Duration::from_secs(3),
            Arc::new(clock.clone()),
        );
        (client, calls)
    }

    #[test]
    fn test_reading_cached_for_ttl() {
        let clock = ManualClock::new();
        let (mut client, calls) = client(
            vec![
                ok("Fan: 1500 rpm\nCPU die temperature: 50.0 C\n"),
                ok("Fan: 2500 rpm\n"),
            ],
            &clock,
        );

        assert_eq!(client.status(), &BridgeStatus::Pending);
        let first = client.read().unwrap();
        assert_eq!(first.cpu_die_c, Some(50.0));
        assert_eq!(client.status(), &BridgeStatus::Connected);

        clock.advance(Duration::from_secs(1));
        assert_eq!(client.read().unwrap(), first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(3));
        assert_eq!(client.read().unwrap().fan_rpm(), Some(2500.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unauthorized_is_sticky_until_retry() {
        let clock = ManualClock::new();
        let (mut client, calls) = client(
            vec![
                Err(StatbarError::bridge_unauthorized("code identity mismatch")),
                ok("Fan: 1200 rpm\n"),
            ],
            &clock,
        );

        assert!(client.read().is_none());
        assert!(matches!(client.status(), BridgeStatus::NoPrivilegedAccess(_)));

        clock.advance(Duration::from_secs(10));
        assert!(client.read().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no retry without user action");

        client.retry();
        assert_eq!(client.read().unwrap().fan_rpm(), Some(1200.0));
        assert_eq!(client.status(), &BridgeStatus::Connected);
    }

    #[test]
    fn test_transient_failures_degrade_without_status_change() {
        let clock = ManualClock::new();
        let (mut client, _) = client(
            vec![
                Err(StatbarError::timeout("privileged sensor bridge", Duration::from_secs(4))),
                Ok(BridgeOutput {
                    exit_code: 1,
                    output: String::new(),
                }),
                ok("garbage that parses to nothing"),
            ],
            &clock,
        );

        for _ in 0..3 {
            assert!(client.read().is_none());
            assert!(client.status().is_usable());
            clock.advance(Duration::from_secs(4));
        }
    }

    #[test]
    fn test_disabled_client() {
        let clock = ManualClock::new();
        let mut client = SensorBridgeClient::disabled(Arc::new(clock)).unwrap();
        assert_eq!(client.status(), &BridgeStatus::Disabled);
        assert!(client.read().is_none());
        client.retry();
        assert_eq!(client.status(), &BridgeStatus::Disabled);
    }

    #[test]
    fn test_response_wire_format() {
        let ok: BridgeResponse =
            serde_json::from_str(r#"{"status":"ok","exit_code":0,"output":"Fan: 1 rpm"}"#).unwrap();
        assert_eq!(
            ok.into_output().unwrap(),
            BridgeOutput {
                exit_code: 0,
                output: "Fan: 1 rpm".to_string()
            }
        );

        let denied: BridgeResponse =
            serde_json::from_str(r#"{"status":"unauthorized","message":"bad signature"}"#).unwrap();
        assert!(denied.into_output().unwrap_err().is_connection_failure());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            BridgeStatus::NoPrivilegedAccess("denied".into()).to_string(),
            "no privileged access (denied)"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_bridge_round_trip() {
        use std::io::{BufRead, BufReader, Write};
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peer.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(&stream).read_line(&mut line).unwrap();
            let request: BridgeRequest = serde_json::from_str(line.trim()).unwrap();
            assert_eq!(request.args[0], "--samplers");

            let reply = BridgeResponse::Ok {
                exit_code: 0,
                output: "CPU die temperature: 47.5 C\n".to_string(),
            };
            let mut out = &stream;
            writeln!(out, "{}", serde_json::to_string(&reply).unwrap()).unwrap();
        });

        let mut bridge = SocketBridge::new(&path, Duration::from_secs(2));
        let out = bridge
            .invoke(&BridgeArgs::sample(&["smc"], 1, 1000).unwrap())
            .unwrap();
        server.join().unwrap();

        assert_eq!(out.exit_code, 0);
        assert_eq!(parse_bridge_output(&out.output).cpu_die_c, Some(47.5));
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_bridge_missing_peer() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = SocketBridge::new(dir.path().join("absent.sock"), Duration::from_secs(1));
        let err = bridge
            .invoke(&BridgeArgs::sample(&["smc"], 1, 1000).unwrap())
            .unwrap_err();
        assert!(matches!(err, StatbarError::BridgeUnavailable(_)));
    }
}
