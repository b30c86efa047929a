//! Configuration loader
//!
//! Loads the client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment when one is present
//! 2. Starts from the file named by `RELAY_CONFIG`, or the first probed
//!    config file, or the defaults when there is none
//! 3. Applies environment variable overrides on top
//! 4. Validates the result
//!
//! A missing API key is not an error: the client is built disabled and
//! every completion returns `None`.
//!
//! ## Environment Variables
//! - `RELAY_CONFIG`: Explicit config file path (must exist when set)
//! - `RELAY_API_KEY`: Backend credential (falls back to `OPENAI_API_KEY` or
//!   `GROQ_API_KEY` depending on the provider)
//! - `RELAY_ENABLED`: Feature flag (true/false)
//! - `RELAY_PROVIDER`: `openai` or `groq`
//! - `RELAY_MODEL`: Model identity (defaults per provider)
//! - `RELAY_BASE_URL`: Endpoint override
//! - `RELAY_TEMPERATURE`, `RELAY_MAX_TOKENS`: Default generation parameters
//! - `RELAY_TIMEOUT_SECS`: Per-call timeout
//! - `RELAY_MAX_RETRIES`, `RELAY_RATE_LIMIT_WAIT_SECS`,
//!   `RELAY_BACKOFF_CAP_SECS`: Retry policy
//! - `RELAY_CACHE_ENABLED`, `RELAY_CACHE_MAX_SIZE`, `RELAY_CACHE_TTL_SECS`:
//!   Response cache
//! - `RELAY_BREAKER_FAILURE_THRESHOLD`, `RELAY_BREAKER_OPEN_DURATION_SECS`:
//!   Circuit breaker
//! - `RELAY_MAX_CALLS_PER_MINUTE`: Local call throttle (unset disables it)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./relay.toml` or `./relay.json` (current working directory)
//! 2. `./config/relay.toml` or `./config/relay.json`
//! 3. `../relay.toml` or `../relay.json` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use relay_domain::{Provider, RelayConfig, RelayError, Result};

/// Load configuration: optional file, then environment overrides
///
/// The file is the one named by `RELAY_CONFIG`, else the first hit of
/// [`probe_config_paths`]. Without either, the defaults are used. Environment
/// variables always override the file.
///
/// # Errors
/// Returns `RelayError::Config` if:
/// - `RELAY_CONFIG` names a file that does not exist
/// - The file format is invalid
/// - An environment variable has an invalid value
/// - A value fails validation
pub fn load() -> Result<RelayConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    let file = env_opt("RELAY_CONFIG").map(PathBuf::from).or_else(probe_config_paths);
    let mut config = match file {
        Some(path) => read_config_file(&path)?,
        None => {
            tracing::debug!("No config file found, starting from defaults");
            RelayConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;

    if !config.is_enabled() {
        tracing::warn!("Completion client disabled (feature flag off or no API key)");
    }
    Ok(config)
}

/// Load configuration from environment variables only
///
/// Every variable overrides a default. Without an API key the configuration
/// is valid but disabled.
///
/// # Errors
/// Returns `RelayError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<RelayConfig> {
    let mut config = RelayConfig::default();
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(config: &mut RelayConfig) -> Result<()> {
    if let Some(name) = env_opt("RELAY_PROVIDER") {
        config.completion.provider = Provider::parse(&name)
            .ok_or_else(|| RelayError::Config(format!("Unknown provider: {}", name)))?;
        config.completion.model = config.completion.provider.default_model().to_string();
    }

    if let Some(key) = api_key_from_env(config.completion.provider) {
        config.completion.api_key = Some(key);
    }

    config.completion.enabled = env_bool("RELAY_ENABLED", config.completion.enabled);
    if let Some(model) = env_opt("RELAY_MODEL") {
        config.completion.model = model;
    }
    if let Some(base_url) = env_opt("RELAY_BASE_URL") {
        config.completion.base_url = Some(base_url);
    }
    override_parsed("RELAY_TEMPERATURE", &mut config.completion.temperature)?;
    override_parsed("RELAY_MAX_TOKENS", &mut config.completion.max_tokens)?;
    override_parsed("RELAY_TIMEOUT_SECS", &mut config.completion.timeout_secs)?;

    override_parsed("RELAY_MAX_RETRIES", &mut config.retry.max_retries)?;
    override_parsed("RELAY_RATE_LIMIT_WAIT_SECS", &mut config.retry.rate_limit_wait_secs)?;
    override_parsed("RELAY_BACKOFF_CAP_SECS", &mut config.retry.backoff_cap_secs)?;

    config.cache.enabled = env_bool("RELAY_CACHE_ENABLED", config.cache.enabled);
    override_parsed("RELAY_CACHE_MAX_SIZE", &mut config.cache.max_size)?;
    override_parsed("RELAY_CACHE_TTL_SECS", &mut config.cache.ttl_secs)?;

    override_parsed("RELAY_BREAKER_FAILURE_THRESHOLD", &mut config.breaker.failure_threshold)?;
    override_parsed("RELAY_BREAKER_OPEN_DURATION_SECS", &mut config.breaker.open_duration_secs)?;

    if let Some(max_calls) = env_parsed("RELAY_MAX_CALLS_PER_MINUTE")? {
        config.throttle.max_calls_per_minute = Some(max_calls);
    }

    Ok(())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `RelayError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<RelayConfig> {
    let config_path = match path {
        Some(p) => p,
        None => probe_config_paths().ok_or_else(|| {
            RelayError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    let mut config = read_config_file(&config_path)?;
    if config.completion.api_key.is_none() {
        config.completion.api_key = api_key_from_env(config.completion.provider);
    }

    config.validate()?;
    Ok(config)
}

/// Read and parse a config file without validating it
fn read_config_file(path: &Path) -> Result<RelayConfig> {
    if !path.exists() {
        return Err(RelayError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| RelayError::Config(format!("Failed to read config file: {}", e)))?;
    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `RelayError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<RelayConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RelayError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RelayError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(RelayError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
        candidates.extend(candidates_in(&cwd.join("config")));
        candidates.extend(candidates_in(&cwd.join("..")));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
            candidates.extend(candidates_in(&exe_dir.join("..")));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 2] {
    [dir.join("relay.toml"), dir.join("relay.json")]
}

/// Credential from `RELAY_API_KEY`, else the provider's conventional variable
fn api_key_from_env(provider: Provider) -> Option<String> {
    let vendor_var = match provider {
        Provider::OpenAi => "OPENAI_API_KEY",
        Provider::Groq => "GROQ_API_KEY",
    };
    env_opt("RELAY_API_KEY").or_else(|| env_opt(vendor_var))
}

/// Non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `RelayError::Config` if the variable is set but does not parse.
fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| RelayError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

fn override_parsed<T>(key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = env_parsed(key)? {
        *target = value;
    }
    Ok(())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
