//! Integration tests for layered configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rust_eventually::config::{ConfigFormat, EnvConfig, LogFormat, file};
use rust_eventually::{EventuallyError, ReconnectPolicy, Settings, TransportPolicy};

fn env(vars: &[(&str, &str)]) -> EnvConfig {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    EnvConfig::from_map("EVENTUALLY", map)
}

fn temp_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rust-eventually-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn defaults_without_environment() {
    let settings = Settings::load_from(&env(&[])).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn environment_overrides_defaults() {
    let settings = Settings::load_from(&env(&[
        ("EVENTUALLY_TIMEOUT_MS", "2500"),
        ("EVENTUALLY_INTERVAL_MS", "50"),
        ("EVENTUALLY_WINDOW_MS", "400"),
        ("EVENTUALLY_STOP_TIMEOUT_MS", "100"),
        ("EVENTUALLY_LOG", "rust_eventually=debug"),
        ("EVENTUALLY_LOG_FORMAT", "json"),
    ]))
    .unwrap();

    assert_eq!(settings.poll.timeout, Duration::from_millis(2500));
    assert_eq!(settings.poll.interval, Duration::from_millis(50));
    assert_eq!(settings.poll.window, Duration::from_millis(400));
    assert_eq!(settings.follower.stop_timeout, Duration::from_millis(100));
    assert_eq!(settings.logging.filter, "rust_eventually=debug");
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn unparsable_environment_value() {
    let err = Settings::load_from(&env(&[("EVENTUALLY_TIMEOUT_MS", "soon")])).unwrap_err();
    assert!(matches!(err, EventuallyError::InvalidConfig { .. }));
    assert!(err.to_string().contains("EVENTUALLY_TIMEOUT_MS"));
}

#[test]
fn inconsistent_values_are_rejected() {
    let err = Settings::load_from(&env(&[
        ("EVENTUALLY_TIMEOUT_MS", "10"),
        ("EVENTUALLY_INTERVAL_MS", "100"),
    ]))
    .unwrap_err();
    assert!(err.is_contract());
}

#[test]
fn toml_file_then_environment() {
    let path = temp_file(
        "layered.toml",
        r#"
[poll]
timeout_ms = 3000
interval_ms = 25
transport_policy = "retry"

[follower]
max_line_length = 1024
reconnect = { strategy = "fixed", delay_ms = 200, max_attempts = 5 }

[logging]
format = "pretty"
"#,
    );
    let settings = Settings::load_from(&env(&[
        ("EVENTUALLY_CONFIG", path.to_str().unwrap()),
        ("EVENTUALLY_INTERVAL_MS", "40"),
    ]))
    .unwrap();

    assert_eq!(settings.poll.timeout, Duration::from_secs(3));
    // The environment wins over the file.
    assert_eq!(settings.poll.interval, Duration::from_millis(40));
    assert_eq!(settings.poll.transport_policy, TransportPolicy::Retry);
    assert_eq!(settings.follower.max_line_length, 1024);
    assert_eq!(
        settings.follower.reconnect,
        ReconnectPolicy::fixed(Duration::from_millis(200), 5)
    );
    assert_eq!(settings.logging.format, LogFormat::Pretty);
}

#[test]
fn json_file() {
    let path = temp_file(
        "settings.json",
        r#"{ "poll": { "window_ms": 750 }, "follower": { "strip_carriage_returns": false } }"#,
    );
    let settings = Settings::from_file(&path).unwrap();
    assert_eq!(settings.poll.window, Duration::from_millis(750));
    assert!(!settings.follower.strip_carriage_returns);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = file::parse_str("[poll]\ntimeout = 5\n", ConfigFormat::Toml).unwrap_err();
    assert!(matches!(err, EventuallyError::ConfigParse { format: "toml", .. }));
}

#[test]
fn missing_file_has_context() {
    let err =
        Settings::from_file(std::path::Path::new("/nonexistent/eventually.toml")).unwrap_err();
    assert!(matches!(err, EventuallyError::IoWithContext { .. }));
}

#[test]
fn format_follows_extension() {
    assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
    assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_extension("yaml"), None);
}
