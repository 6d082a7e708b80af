//! Configuration file discovery and loading
//!
//! Config file resolution order:
//! 1. Explicit path (command-line argument or environment variable)
//! 2. Per-user config directory (`~/.config/<app>/config.toml` on Linux)
//! 3. System-wide `/etc/<app>/config.toml` (Linux only)
//!
//! A missing config file is not an error unless it was requested explicitly;
//! callers fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name looked up inside each config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Candidate config file locations for `app`, highest priority first.
pub fn config_file_candidates(app: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(app).join(CONFIG_FILE_NAME));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(app).join(CONFIG_FILE_NAME));
    }

    candidates
}

/// Locate the config file to use.
///
/// # Returns
/// - `Ok(Some(path))` when an explicit or discovered file exists
/// - `Ok(None)` when no explicit path was given and nothing was discovered
///
/// # Errors
/// An explicit path that does not exist is a configuration error.
pub fn find_config_file(explicit: Option<&Path>, app: &str) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    for candidate in config_file_candidates(app) {
        debug!("Checking for config file at {}", candidate.display());
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Read and deserialize a TOML file.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(value)
}
