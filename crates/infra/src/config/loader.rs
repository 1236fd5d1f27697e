//! Configuration loader
//!
//! Loads queue configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `SITECAP_STORE_PATH` is absent, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is checked with [`Config::validate`].
//!
//! ## Environment Variables
//! - `SITECAP_STORE_PATH`: Queue file or database path (required)
//! - `SITECAP_STORE_BACKEND`: `file` or `sqlite`
//! - `SITECAP_STORE_KEY`: Row key for the sqlite backend
//! - `SITECAP_STORE_POOL_SIZE`: Connection pool size
//! - `SITECAP_QUEUE_MAX_ATTEMPTS`: Attempts before an item is parked as failed
//! - `SITECAP_QUEUE_RESET_STALE`: Reset `processing` items on open (true/false)
//! - `SITECAP_NETWORK_PROBE_URL`: URL probed before each pass
//! - `SITECAP_NETWORK_TIMEOUT_MS`: Probe timeout in milliseconds
//! - `SITECAP_NETWORK_CHECK_ENABLED`: Whether to probe at all (true/false)
//! - `SITECAP_WORKER_POLL_INTERVAL`: Seconds between background passes
//! - `SITECAP_WORKER_PASS_TIMEOUT`: Upper bound on one pass in seconds
//! - `SITECAP_LOG_LEVEL`: Default log filter
//! - `SITECAP_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./sitecap.json` or `./sitecap.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use sitecap_domain::{Config, Result, SitecapError, StoreBackend};

const CONFIG_FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "sitecap.json", "sitecap.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SitecapError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `SITECAP_STORE_PATH` is required; every other variable falls back to
/// the default when unset.
///
/// # Errors
/// Returns `SitecapError::Config` if the store path is missing or a set
/// variable cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.store.path = PathBuf::from(env_var("SITECAP_STORE_PATH")?);
    if let Some(backend) = env_parse::<StoreBackend>("SITECAP_STORE_BACKEND")? {
        config.store.backend = backend;
    }
    if let Ok(key) = std::env::var("SITECAP_STORE_KEY") {
        config.store.key = key;
    }
    if let Some(pool_size) = env_parse("SITECAP_STORE_POOL_SIZE")? {
        config.store.pool_size = pool_size;
    }

    if let Some(max_attempts) = env_parse("SITECAP_QUEUE_MAX_ATTEMPTS")? {
        config.queue.max_attempts = max_attempts;
    }
    config.queue.reset_stale_on_open =
        env_bool("SITECAP_QUEUE_RESET_STALE", config.queue.reset_stale_on_open)?;

    if let Ok(url) = std::env::var("SITECAP_NETWORK_PROBE_URL") {
        config.network.probe_url = url;
    }
    if let Some(timeout_ms) = env_parse("SITECAP_NETWORK_TIMEOUT_MS")? {
        config.network.timeout_ms = timeout_ms;
    }
    config.network.check_enabled =
        env_bool("SITECAP_NETWORK_CHECK_ENABLED", config.network.check_enabled)?;

    if let Some(interval) = env_parse("SITECAP_WORKER_POLL_INTERVAL")? {
        config.worker.poll_interval_secs = interval;
    }
    if let Some(timeout) = env_parse("SITECAP_WORKER_PASS_TIMEOUT")? {
        config.worker.pass_timeout_secs = timeout;
    }

    if let Ok(level) = std::env::var("SITECAP_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("SITECAP_LOG_JSON", config.logging.json)?;

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Format is detected by file extension.
///
/// # Errors
/// Returns `SitecapError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SitecapError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SitecapError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SitecapError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SitecapError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SitecapError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SitecapError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Searches the current working directory (plus `config.*` in up to two
/// parents), then the same set relative to the executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut bases = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        bases.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        bases.push(exe_dir);
    }

    bases.iter().flat_map(|base| candidates_in(base)).find(|path| path.exists())
}

fn candidates_in(base: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(|name| base.join(name)).collect();
    for parent in ["..", "../.."] {
        candidates.push(base.join(parent).join("config.json"));
        candidates.push(base.join(parent).join("config.toml"));
    }
    candidates
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SitecapError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable; set-but-invalid is an error.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SitecapError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Any other value is a config error.
fn env_bool(key: &str, default: bool) -> Result<bool> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SitecapError::Config(format!("Invalid boolean for {key}: {raw}"))),
    }
}
