//! Persistence settings loader
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required ones are missing, falls back to a config file
//! 3. Probes a few well-known paths for that file
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TOKENCACHE_CACHE_DIR`: directory holding the cache and `.lockfile` (required)
//! - `TOKENCACHE_CACHE_FILE`: cache file name (required)
//! - `TOKENCACHE_LOCK_RETRY_DELAY_MS`: pause between lock attempts
//! - `TOKENCACHE_LOCK_RETRY_COUNT`: number of lock attempts
//! - `TOKENCACHE_KEYCHAIN_SERVICE`: keychain service name
//! - `TOKENCACHE_KEYCHAIN_ACCOUNT`: keychain account name
//! - `TOKENCACHE_UNPROTECTED_FILE`: store a plain file on Linux (true/false)
//!
//! ## File Locations
//! `./tokencache.toml`, `./tokencache.json`, `../tokencache.toml`, then the
//! same names next to the executable.

use std::path::{Path, PathBuf};

use tokencache_domain::{
    KeychainSettings, LockRetrySettings, PersistenceSettings, Result, TokenCacheError,
};

const CONFIG_FILE_NAMES: [&str; 3] = ["tokencache.toml", "tokencache.json", "../tokencache.toml"];

/// Load settings with automatic fallback strategy
///
/// # Errors
/// Returns `TokenCacheError::Config` if neither source yields valid
/// settings.
pub fn load() -> Result<PersistenceSettings> {
    match load_from_env() {
        Ok(settings) => {
            tracing::info!("config.loaded_from_env");
            Ok(settings)
        }
        Err(e) => {
            tracing::debug!(error = %e, "config.env_incomplete_trying_file");
            load_from_file(None)
        }
    }
}

/// Load settings from environment variables
///
/// # Errors
/// Returns `TokenCacheError::Config` if a required variable is missing,
/// a numeric variable does not parse, or the result fails validation.
pub fn load_from_env() -> Result<PersistenceSettings> {
    let cache_directory = env_var("TOKENCACHE_CACHE_DIR")?;
    let cache_file_name = env_var("TOKENCACHE_CACHE_FILE")?;

    let defaults = LockRetrySettings::default();
    let delay_ms = env_parse("TOKENCACHE_LOCK_RETRY_DELAY_MS", defaults.delay_ms)?;
    let retry_count = env_parse("TOKENCACHE_LOCK_RETRY_COUNT", defaults.retry_count)?;

    let mut builder = PersistenceSettings::builder(cache_file_name, PathBuf::from(cache_directory))
        .lock_retry(delay_ms, retry_count);

    let service = std::env::var("TOKENCACHE_KEYCHAIN_SERVICE").ok();
    let account = std::env::var("TOKENCACHE_KEYCHAIN_ACCOUNT").ok();
    if service.is_some() || account.is_some() {
        let defaults = KeychainSettings::default();
        builder = builder.keychain(
            service.unwrap_or(defaults.service),
            account.unwrap_or(defaults.account),
        );
    }

    if env_bool("TOKENCACHE_UNPROTECTED_FILE", false) {
        builder = builder.use_unprotected_file_on_linux();
    }

    builder.build()
}

/// Load settings from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `TokenCacheError::Config` if the file is missing or unreadable,
/// malformed, or describes invalid settings.
pub fn load_from_file(path: Option<PathBuf>) -> Result<PersistenceSettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TokenCacheError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TokenCacheError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "config.loading_file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TokenCacheError::Config(format!("Failed to read config file: {e}")))?;

    let settings = parse_config(&contents, &config_path)?;
    settings.validate()?;
    Ok(settings)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<PersistenceSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TokenCacheError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TokenCacheError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TokenCacheError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        TokenCacheError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| TokenCacheError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
