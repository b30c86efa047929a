//! Client configuration loading
//!
//! Builds the process-wide `RelayConfig` from the environment, a `.env`
//! file, or a `relay.toml`/`relay.json` file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
