//! Tests for layered configuration loading.

use super::*;
use crate::StoreProvider;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = MnemaConfig::load_from_str("{}").expect("config");
    assert_eq!(config.agent.model, "gpt-4");
    assert_eq!(config.agent.max_iterations, 8);
    assert_eq!(config.memory.search_limit, 10);
    assert_eq!(config.memory.query_window, 3);
    assert_eq!(config.model.timeout_secs, 30);
    assert_eq!(config.checkpoints.provider, StoreProvider::File);
    assert!(config.agent.system_prompt.contains("{user_info}"));
    assert!(config.agent.system_prompt.contains("{time}"));
}

/// JSON5 niceties (comments, trailing commas) are accepted.
#[test]
fn parse_json5_with_comments() {
    let json5 = r#"{
        // keep the loop short in tests
        agent: { max_iterations: 2, turn_timeout_secs: null, },
        memory: { provider: "memory", min_score: 0.1 },
    }"#;
    let config = MnemaConfig::load_from_str(json5).expect("config");
    assert_eq!(config.agent.max_iterations, 2);
    assert_eq!(config.agent.turn_timeout_secs, None);
    assert_eq!(config.memory.provider, StoreProvider::Memory);
    assert_eq!(config.memory.min_score, Some(0.1));
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = MnemaConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

/// Reject invalid provider values with the field path in the message.
#[test]
fn rejects_invalid_store_provider() {
    let err = MnemaConfig::load_from_str(r#"{ memory: { provider: "redis" } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("memory.provider"));
}

/// A zero loop limit would never reach the model.
#[test]
fn rejects_zero_max_iterations() {
    let err = MnemaConfig::load_from_str(r#"{ agent: { max_iterations: 0 } }"#).unwrap_err();
    assert!(format!("{err}").contains("max_iterations"));
}

/// Ensure cwd config overrides user config and runtime overrides both.
#[test]
fn layered_config_applies_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("home").join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE);
    write_json5(
        &user_config,
        r#"{ agent: { model: "user-model", max_iterations: 3 }, memory: { search_limit: 7 } }"#,
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ agent: { model: "cwd-model" } }"#,
    );
    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, r#"{ memory: { search_limit: 2 } }"#);

    let mut options = LayeredConfigOptions::new(&cwd).with_runtime_path(&runtime_config);
    options.user_config_path = Some(user_config);

    let layered = MnemaConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.agent.model, "cwd-model");
    assert_eq!(layered.config.agent.max_iterations, 3);
    assert_eq!(layered.config.memory.search_limit, 2);
    let sources = layered
        .layers
        .iter()
        .map(|layer| layer.source)
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime
        ]
    );
}

/// Missing optional layers are skipped rather than failing.
#[test]
fn layered_config_without_files_uses_defaults() {
    let temp = TempDir::new().expect("tmp");
    let mut options = LayeredConfigOptions::new(temp.path());
    options.user_config_path = Some(temp.path().join("absent.json5"));
    let layered = MnemaConfig::load_layered_with_options(options).expect("layered");
    assert!(layered.layers.is_empty());
    assert_eq!(layered.config.agent.max_iterations, 8);
}

/// A missing runtime override is an error.
#[test]
fn layered_config_requires_runtime_paths() {
    let temp = TempDir::new().expect("tmp");
    let mut options =
        LayeredConfigOptions::new(temp.path()).with_runtime_path(temp.path().join("nope.json5"));
    options.user_config_path = None;
    let err = MnemaConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}
