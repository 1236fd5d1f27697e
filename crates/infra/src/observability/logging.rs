//! Structured logging with `tracing`.
//!
//! `RUST_LOG` takes precedence over the configured level, so per-module
//! directives such as `sitecap_core=debug,sitecap_infra=info` work without
//! touching configuration.

use sitecap_domain::{LoggingConfig, Result, SitecapError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber: compact lines by default, one JSON
/// object per event when `config.json` is set.
///
/// # Errors
/// Returns `SitecapError::Config` for an unparsable level and
/// `SitecapError::Internal` when a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(config)?;

    let json_layer = config.json.then(|| fmt::layer().json().with_target(true).with_current_span(true));
    let compact_layer = (!config.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(compact_layer)
        .try_init()
        .map_err(|e| SitecapError::Internal(format!("logging already initialised: {e}")))
}

/// Filter from `RUST_LOG` when set, otherwise from `config.level`.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level)
        .map_err(|e| SitecapError::Config(format!("Invalid log level '{}': {e}", config.level)))
}
