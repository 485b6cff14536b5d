//! Environment configuration loader.
//!
//! Loads `KEY=VALUE` pairs from the first environment file found, so every
//! mcpress process shares one configuration source. Call
//! [`load_environment`] early in `main()` before reading any settings.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

/// Candidate environment files, checked in order.
pub const ENV_FILE_PATHS: &[&str] = &["/etc/mcpress/environment", "/etc/mcpress.env", ".env"];

/// Load environment variables from the first configuration file found.
///
/// `MCPRESS_ENV_FILE` overrides the search path. Existing environment
/// variables are never overridden. Returns the path that was loaded, or
/// None when no file exists.
pub fn load_environment() -> Option<String> {
    if let Ok(custom) = std::env::var("MCPRESS_ENV_FILE") {
        if let Some(path) = load_env_file(&custom) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded) = load_env_file(path) {
            return Some(loaded);
        }
    }

    debug!("no environment file found, using existing environment");
    None
}

fn load_env_file(path: &str) -> Option<String> {
    if !Path::new(path).exists() {
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("failed to read environment file {}: {}", path, e);
            return None;
        }
    };

    let mut loaded = 0usize;
    let mut skipped = 0usize;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = parse_env_line(line) else {
            continue;
        };
        if std::env::var(&key).is_ok() {
            skipped += 1;
            continue;
        }
        debug!(
            "loaded {}={}",
            key,
            if is_secret_key(&key) { "***" } else { &value }
        );
        std::env::set_var(&key, &value);
        loaded += 1;
    }

    info!(
        "loaded {} environment variables from {} ({} already set)",
        loaded, path, skipped
    );
    Some(path.to_string())
}

/// Parse one `KEY=VALUE` line, stripping a single layer of quotes.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

fn is_secret_key(key: &str) -> bool {
    ["KEY", "TOKEN", "SECRET", "PASSWORD"]
        .iter()
        .any(|marker| key.contains(marker))
}

/// Get a configuration value with a default.
pub fn get_config(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an optional configuration value; empty values count as unset.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get a boolean configuration value.
pub fn get_config_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Get an integer configuration value.
pub fn get_config_int(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
