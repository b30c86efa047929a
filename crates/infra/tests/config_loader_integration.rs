//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! building a client from it.

use std::io::Write;

use std::sync::Mutex;

use once_cell::sync::Lazy;
use relay_domain::{ChatMessage, CompletionOptions, Provider};
use relay_infra::{build_client, build_client_from_env, config};
use tempfile::NamedTempFile;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const KEY_VARS: &[&str] = &["RELAY_CONFIG", "RELAY_API_KEY", "OPENAI_API_KEY", "GROQ_API_KEY"];

#[test]
fn test_load_config_from_toml_file_and_build_client() {
    let toml_content = r#"
[completion]
enabled = true
provider = "openai"
model = "gpt-4o-mini"
api_key = "sk-integration"
temperature = 0.3
max_tokens = 500

[retry]
max_retries = 2
rate_limit_wait_secs = 5

[cache]
max_size = 10
ttl_secs = 60

[breaker]
failure_threshold = 3
open_duration_secs = 30

[throttle]
max_calls_per_minute = 20
"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();
    let config = result.expect("Failed to load config from TOML file");

    assert_eq!(config.completion.provider, Provider::OpenAi);
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.breaker.open_duration_secs, 30);
    assert_eq!(config.throttle.max_calls_per_minute, Some(20));

    let client = build_client(config).expect("Failed to build client");
    let info = client.config_info();
    assert!(info.enabled);
    assert_eq!(info.max_tokens, 500);
    assert_eq!(info.max_calls_per_minute, Some(20));
    assert_eq!(info.cache.map(|stats| stats.max_size), Some(10));
}

#[test]
fn test_invalid_values_are_rejected() {
    let json_content = r#"{"cache": {"max_size": 0}}"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();

    assert!(result.is_err(), "Zero cache capacity must be rejected");
}

/// Validates startup without credentials.
///
/// A host with no API key and no config file still gets a client; it is
/// disabled and every completion returns `None`.
///
/// Assertions:
/// - Confirms `build_client_from_env` succeeds.
/// - Confirms the client is disabled and unavailable.
/// - Confirms environment overrides still reach the client.
#[tokio::test]
async fn test_missing_credentials_build_disabled_client() {
    let client = {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        for key in KEY_VARS {
            std::env::remove_var(key);
        }
        std::env::set_var("RELAY_MAX_RETRIES", "7");

        let result = build_client_from_env();
        std::env::remove_var("RELAY_MAX_RETRIES");
        result.expect("disabled client")
    };

    assert!(!client.is_enabled());
    assert!(!client.is_available());
    assert_eq!(client.config_info().max_retries, 7);

    let reply = client
        .completion(&[ChatMessage::user("hello")], &CompletionOptions::default())
        .await;
    assert_eq!(reply, None);
}
