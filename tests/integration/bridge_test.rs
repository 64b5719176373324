use std::sync::Arc;
use std::time::Duration;

use statbar::core::sampler::clock::ManualClock;
use statbar::platform::sensors::{
    validate_bridge_args, BridgeArgs, BridgeStatus, SensorBridgeClient, MAX_BRIDGE_ARGS,
};

fn args(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_whitelisted_arguments_pass() {
    assert!(validate_bridge_args(&args(&["--samplers", "smc,thermal", "-n", "1", "-i", "500"])).is_ok());
    assert!(BridgeArgs::sample(&["smc", "gpu_power"], 2, 250).is_ok());
}

#[test]
fn test_injection_attempts_rejected() {
    let attacks: &[&[&str]] = &[
        &["--samplers", "smc;rm -rf ~"],
        &["--samplers", "smc", "|", "sh"],
        &["-o", "/etc/passwd"],
        &["--samplers", "$(id)"],
        &["--samplers", "`whoami`"],
        &["--samplers", "smc\n--output"],
        &["--samplers", "../../bin/sh"],
        &["--samplers", "keylogger"],
        &[],
    ];

    for attack in attacks {
        assert!(
            validate_bridge_args(&args(attack)).is_err(),
            "{:?} should be rejected",
            attack
        );
    }
}

#[test]
fn test_argument_count_is_bounded() {
    let mut many = vec!["--show-all"; MAX_BRIDGE_ARGS];
    assert!(validate_bridge_args(&args(&many)).is_ok());
    many.push("--show-all");
    assert!(validate_bridge_args(&args(&many)).is_err());
}

#[cfg(unix)]
#[test]
fn test_missing_socket_means_no_privileged_access() {
    use statbar::platform::sensors::SocketBridge;

    let dir = tempfile::tempdir().unwrap();
    let bridge = SocketBridge::new(dir.path().join("absent.sock"), Duration::from_millis(200));
    let mut client = SensorBridgeClient::new(
        Some(Box::new(bridge)),
        BridgeArgs::sample(&["smc"], 1, 500).unwrap(),
        Duration::from_secs(3),
        Arc::new(ManualClock::new()),
    );

    assert!(client.read().is_none());
    let status = client.status().clone();
    assert!(matches!(status, BridgeStatus::NoPrivilegedAccess(_)));
    assert!(status.to_string().starts_with("no privileged access"));

    client.retry();
    assert_eq!(client.status(), &BridgeStatus::Pending);
}

#[test]
fn test_status_serializes_with_reason() {
    let json = serde_json::to_value(BridgeStatus::NoPrivilegedAccess("denied".into())).unwrap();
    assert_eq!(json["state"], "no_privileged_access");
    assert_eq!(json["reason"], "denied");

    let json = serde_json::to_value(BridgeStatus::Connected).unwrap();
    assert_eq!(json["state"], "connected");
}
