//! Path resolution for vhostctl
//!
//! # Environment Variables
//!
//! - `VHOSTCTL_CONFIG_DIR` - Override config directory (e.g., `/etc/vhostctl`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `VHOSTCTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/vhostctl` (if set)
//! 3. `~/.config/vhostctl`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "VHOSTCTL_CONFIG_DIR";

/// Manifest file name inside the config directory
pub const MANIFEST_FILE: &str = "vhosts.toml";

/// Get the vhostctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("vhostctl");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("vhostctl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Resolve the manifest path, preferring an explicit `--config`
pub fn manifest_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(&path.to_string_lossy())),
        None => Ok(config_dir()?.join(MANIFEST_FILE)),
    }
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Expand a path in place
pub fn expand_in_place(path: &mut PathBuf) {
    *path = expand(&path.to_string_lossy());
}
