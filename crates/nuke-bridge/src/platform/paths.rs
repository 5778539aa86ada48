//! Platform-specific path utilities.
//!
//! This module provides functions to get platform-specific paths for:
//! - The INI file NukeServerSocket writes inside the user's `.nuke` folder
//! - The bridge's own settings file

use crate::config::{PathsConfig, ServerConfig};
use crate::error::{BridgeError, Result};
use std::path::{Path, PathBuf};

/// Get the user's `.nuke` directory.
///
/// # Platform Behavior
/// Nuke uses `~/.nuke` on every platform:
/// - **Linux/macOS**: `$HOME/.nuke`
/// - **Windows**: `%USERPROFILE%\.nuke`
pub fn nuke_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| BridgeError::Config {
        message: "Could not determine home directory".to_string(),
    })?;
    Ok(nuke_dir_in(&home))
}

/// `.nuke` directory under an explicit home, for tests and embedders.
pub fn nuke_dir_in(home: &Path) -> PathBuf {
    home.join(ServerConfig::INI_DIR_NAME)
}

/// Path of the INI file NukeServerSocket writes with its listening port.
///
/// The file only exists once the listener has been configured inside Nuke.
pub fn server_ini_path() -> Result<PathBuf> {
    Ok(nuke_dir()?.join(ServerConfig::INI_FILE_NAME))
}

/// Default location of the bridge settings file.
///
/// # Platform Behavior
/// Uses the `dirs` crate config directory:
/// - **Linux**: `~/.config/nuke-bridge/settings.json`
/// - **Windows**: `%APPDATA%\nuke-bridge\settings.json`
/// - **macOS**: `~/Library/Application Support/nuke-bridge/settings.json`
pub fn default_settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| BridgeError::Config {
        message: "Could not determine config directory".to_string(),
    })?;
    Ok(config_dir
        .join(PathsConfig::SETTINGS_DIR_NAME)
        .join(PathsConfig::SETTINGS_FILE_NAME))
}
