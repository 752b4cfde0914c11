use std::io::Write;

use vox_relay::config::Config;

#[test]
fn test_defaults_when_config_file_is_absent() {
    let cfg = Config::load("/nonexistent/path/vox-relay").unwrap();

    assert_eq!(cfg.mqtt.host, "localhost");
    assert_eq!(cfg.mqtt.port, 1883);
    assert_eq!(cfg.mqtt.client_id, "vox-relay");
    assert_eq!(cfg.mqtt.max_payload_size, 100_000);
    assert_eq!(cfg.topics.commands, "voice/commands/text");
    assert_eq!(cfg.topics.responses, "voice/responses/text");
    assert_eq!(cfg.audio.sample_rate, 16000);
    assert_eq!(cfg.audio.record_seconds, 6.0);
    assert_eq!(cfg.limits.max_text_length, 500);

    cfg.validate().unwrap();
}

#[test]
fn test_loads_values_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vox-relay.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
[mqtt]
host = "broker.local"
port = 8883
tls = true
username = "relay"
password = "secret"

[topics]
commands = "house/commands"
responses = "house/responses"
qos = 1

[audio]
record_seconds = 4.0

[limits]
max_text_length = 200
"#
    )
    .unwrap();

    let cfg = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.mqtt.host, "broker.local");
    assert_eq!(cfg.mqtt.port, 8883);
    assert!(cfg.mqtt.tls);
    assert_eq!(cfg.mqtt.username, "relay");
    assert_eq!(cfg.topics.commands, "house/commands");
    assert_eq!(cfg.topics.qos, 1);
    assert_eq!(cfg.audio.record_seconds, 4.0);
    assert_eq!(cfg.limits.max_text_length, 200);
    // Unset sections keep their defaults.
    assert_eq!(cfg.audio.sample_rate, 16000);
    assert_eq!(cfg.engines.wake.backend, "energy");

    cfg.validate().unwrap();
}

#[test]
fn test_validate_rejects_empty_host() {
    let mut cfg = Config::default();
    cfg.mqtt.host = String::new();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_port() {
    let mut cfg = Config::default();
    cfg.mqtt.port = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_record_window() {
    let mut cfg = Config::default();
    cfg.audio.record_seconds = 0.0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.audio.record_seconds = 60.0; // above max_record_seconds
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_invalid_qos() {
    let mut cfg = Config::default();
    cfg.topics.qos = 3;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_text_limit() {
    let mut cfg = Config::default();
    cfg.limits.max_text_length = 0;
    assert!(cfg.validate().is_err());
}
