use super::data::Config;
use super::io::ConfigError;
use crate::core::constants::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_TEMPERATURE,
};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(config, Config::default());
}

#[test]
fn defaults_match_original_settings() {
    let params = Config::default().completion_params();
    assert_eq!(params.model, DEFAULT_MODEL);
    assert_eq!(params.temperature, DEFAULT_TEMPERATURE);
    assert_eq!(params.max_tokens, DEFAULT_MAX_TOKENS);
    assert_eq!(params.idle_timeout, Some(Duration::from_secs(60)));
    assert_eq!(Config::default().base_url(), DEFAULT_OPENAI_BASE_URL);
}

#[test]
fn test_load_values_from_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
base_url = "http://localhost:11434/v1"
model = "llava"
temperature = 0.7
max_tokens = 512
idle_timeout_secs = 0
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(config.base_url(), "http://localhost:11434/v1");

    let params = config.completion_params();
    assert_eq!(params.model, "llava");
    assert_eq!(params.max_tokens, 512);
    assert!((params.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(params.idle_timeout, None);
}

#[test]
fn test_parse_error_names_the_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "temperature = \"warm\"").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn out_of_range_values_are_normalized() {
    let config = Config {
        temperature: Some(5.0),
        max_tokens: Some(0),
        model: Some("  ".into()),
        ..Default::default()
    };
    assert_eq!(config.temperature(), 2.0);
    assert_eq!(config.max_tokens(), DEFAULT_MAX_TOKENS);
    assert_eq!(config.model(), DEFAULT_MODEL);

    let negative = Config {
        temperature: Some(-1.0),
        ..Default::default()
    };
    assert_eq!(negative.temperature(), 0.0);

    let nan = Config {
        temperature: Some(f32::NAN),
        ..Default::default()
    };
    assert_eq!(nan.temperature(), DEFAULT_TEMPERATURE);
}

#[test]
fn base_url_override_ignores_empty_values() {
    let mut config = Config::default();
    config.apply_base_url_override(Some(String::new()));
    assert_eq!(config.base_url(), DEFAULT_OPENAI_BASE_URL);

    config.apply_base_url_override(Some("https://example.test/v1".into()));
    assert_eq!(config.base_url(), "https://example.test/v1");

    config.apply_base_url_override(None);
    assert_eq!(config.base_url(), "https://example.test/v1");
}

#[test]
fn http_client_builds_with_configured_timeouts() {
    let config = Config {
        connect_timeout_secs: Some(3),
        ..Default::default()
    };
    assert_eq!(config.connect_timeout(), Duration::from_secs(3));
    assert!(config.http_client().is_ok());
}
