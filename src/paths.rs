//! Path resolution for k5sync
//!
//! # Config file priority
//!
//! 1. `--config` flag, or the `K5SYNC_CONFIG` environment variable
//! 2. `$XDG_CONFIG_HOME/k5sync/config.toml` (if set)
//! 3. `~/.config/k5sync/config.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the k5sync config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        let path = PathBuf::from(xdg_config).join("k5sync");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("k5sync");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Resolve the desired-state file, honoring an explicit path first
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            let path = expand_path(&path.to_string_lossy());
            log::debug!("Using explicit config: {}", path.display());
            Ok(path)
        }
        None => Ok(config_dir()?.join(CONFIG_FILE)),
    }
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
