use statbar::core::config::Config;
use statbar::core::sampler::model::TimeRange;
use statbar::core::sampler::scheduler::Profile;
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.profile, Profile::Balanced);
    assert_eq!(config.time_range, TimeRange::Now);
    assert!(config.bridge.enabled);
    assert!(config.bridge.socket_path.is_none());
}

#[test]
fn test_config_load_nonexistent_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&temp_dir.path().join("missing.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let config = Config {
        profile: Profile::Performance,
        time_range: TimeRange::Hour24,
        cache_ttl_ms: 5000,
        ..Default::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.interval().as_millis(), 500);
}

#[test]
fn test_corrupt_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    std::fs::write(&path, "{ this is not json").unwrap();
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());

    std::fs::write(&path, "   \n").unwrap();
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_config_serialized_names() {
    let json = serde_json::to_value(Config::default()).unwrap();
    assert_eq!(json["profile"], "balanced");
    assert_eq!(json["time_range"], "now");
    assert_eq!(json["bridge"]["samplers"][0], "smc");
}
