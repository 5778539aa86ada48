//! Centralized configuration for Nuke Bridge.
//!
//! Constants are grouped on unit structs; user-facing settings are loaded
//! into [`Settings`] and validated once, at load time.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Defaults for reaching the listener inside Nuke.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 54321;
    pub const INI_DIR_NAME: &'static str = ".nuke";
    pub const INI_FILE_NAME: &'static str = "NukeServerSocket.ini";
    pub const INI_SECTION: &'static str = "server";
    pub const INI_PORT_KEY: &'static str = "port";
}

/// Transport limits and timeouts.
pub struct TransportConfig;

impl TransportConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
    pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024; // 16MB
    pub const READ_CHUNK_SIZE: usize = 64 * 1024;
}

/// Paths used by the command-line entrypoint.
pub struct PathsConfig;

impl PathsConfig {
    pub const SETTINGS_DIR_NAME: &'static str = "nuke-bridge";
    pub const SETTINGS_FILE_NAME: &'static str = "settings.json";
}

/// How the response is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One write, no half-close; the first non-empty read is the whole
    /// response. This is what NukeServerSocket speaks.
    #[default]
    FirstChunk,
    /// Client half-closes after the payload; the response runs until the
    /// listener closes the connection.
    UntilClose,
    /// 4-byte big-endian length prefix in both directions.
    LengthPrefixed,
}

/// Manual connection override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettings {
    pub enable_manual_connection: bool,
    #[serde(default)]
    pub host: String,
    /// Kept as text: the editor setting is a free-form string and an empty
    /// value means "not set".
    #[serde(default)]
    pub port: String,
}

/// Output log behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    pub clear_previous_output: bool,
}

/// Socket behavior for each exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSettings {
    pub framing: Framing,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub max_response_bytes: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            connect_timeout_ms: TransportConfig::CONNECT_TIMEOUT.as_millis() as u64,
            response_timeout_ms: TransportConfig::RESPONSE_TIMEOUT.as_millis() as u64,
            max_response_bytes: TransportConfig::MAX_RESPONSE_SIZE,
        }
    }
}

impl TransportSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// User settings for the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub network: NetworkSettings,
    pub output: OutputSettings,
    #[serde(default)]
    pub transport: TransportSettings,
}

impl Settings {
    /// Parse and validate settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json).map_err(|e| BridgeError::Config {
            message: format!("Invalid settings: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BridgeError::io_with_path(e, path))?;
        Self::from_json(&content).map_err(|e| match e {
            BridgeError::Config { message } => BridgeError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let transport = &self.transport;
        if transport.connect_timeout_ms == 0 {
            return Err(BridgeError::Config {
                message: "transport.connect_timeout_ms must be greater than zero".to_string(),
            });
        }
        if transport.response_timeout_ms == 0 {
            return Err(BridgeError::Config {
                message: "transport.response_timeout_ms must be greater than zero".to_string(),
            });
        }
        if transport.max_response_bytes == 0 {
            return Err(BridgeError::Config {
                message: "transport.max_response_bytes must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
