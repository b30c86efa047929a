//! Logging setup
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter`. `RUST_LOG`
//! overrides the default filter; `RELAY_LOG_FORMAT=json` switches to JSON
//! lines.
//!
//! ```rust
//! use relay_infra::observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Pretty);
//! // A second call is a no-op.
//! assert!(!init_tracing(LogFormat::Json));
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "relay=info";

/// Output format of the log layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Format selected by `RELAY_LOG_FORMAT`, `Pretty` when unset
    pub fn from_env() -> Self {
        match std::env::var("RELAY_LOG_FORMAT") {
            Ok(value) if value.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a global subscriber was already installed, so hosts
/// and tests may call this freely.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    match result {
        Ok(()) => {
            tracing::debug!(?format, "Tracing initialised");
            true
        }
        Err(_) => false,
    }
}
