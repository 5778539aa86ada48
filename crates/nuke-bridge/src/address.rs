//! Listener address resolution.
//!
//! The address is recomputed for every request from three sources, lowest
//! priority first: the built-in default, the port NukeServerSocket wrote to
//! its INI file, and the manual connection override. Resolution never fails;
//! every source that could not be used is reported as an [`AddressWarning`].

use crate::config::{NetworkSettings, ServerConfig};
use crate::error::{BridgeError, Result};
use crate::ini::{lookup_server_port, PortLookup};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Host and port of a remote listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionAddress {
    host: String,
    port: u16,
}

impl ConnectionAddress {
    /// Build an address, rejecting ports outside `1..=65535`.
    ///
    /// The port is taken as a wider integer so callers holding unchecked
    /// values get a range error instead of a silent truncation.
    pub fn new(host: impl Into<String>, port: impl Into<u64>) -> Result<Self> {
        let port = port.into();
        match u16::try_from(port) {
            Ok(p) if p != 0 => Ok(Self {
                host: host.into(),
                port: p,
            }),
            _ => Err(BridgeError::PortOutOfRange { port }),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for ConnectionAddress {
    fn default() -> Self {
        Self {
            host: ServerConfig::DEFAULT_HOST.to_string(),
            port: ServerConfig::DEFAULT_PORT,
        }
    }
}

impl fmt::Display for ConnectionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A source that was skipped while resolving the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressWarning {
    /// The INI file exists but could not be read.
    IniUnreadable { path: PathBuf, message: String },
    /// The INI port entry is not five digits or not a valid port.
    IniPortInvalid { path: PathBuf, entry: String },
    /// Manual connection is enabled but the host is empty.
    ManualHostEmpty,
    /// Manual connection is enabled but the port is empty.
    ManualPortEmpty,
    /// Manual connection is enabled but the port is not a valid port.
    ManualPortInvalid { value: String },
}

impl fmt::Display for AddressWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressWarning::IniUnreadable { path, message } => write!(
                f,
                "Could not read {}: {}. Using default port {}.",
                path.display(),
                message,
                ServerConfig::DEFAULT_PORT
            ),
            AddressWarning::IniPortInvalid { path, entry } => write!(
                f,
                "Invalid port entry '{}' in {}. Using default port {}.",
                entry,
                path.display(),
                ServerConfig::DEFAULT_PORT
            ),
            AddressWarning::ManualHostEmpty => write!(
                f,
                "Manual connection is enabled but the host is empty. Falling back to the default host."
            ),
            AddressWarning::ManualPortEmpty => write!(
                f,
                "Manual connection is enabled but the port is empty. Falling back to the configured port."
            ),
            AddressWarning::ManualPortInvalid { value } => write!(
                f,
                "Manual connection port '{}' is not a valid port. Falling back to the configured port.",
                value
            ),
        }
    }
}

/// The resolved address together with every fallback taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub address: ConnectionAddress,
    pub warnings: Vec<AddressWarning>,
}

/// Resolve the listener address for one request.
///
/// `ini_path` is the NukeServerSocket INI file; pass `None` when no home
/// directory is available. A missing file is not reported. Fallbacks are
/// returned in [`Resolution::warnings`] for the caller to surface.
pub fn resolve_address(network: &NetworkSettings, ini_path: Option<&Path>) -> Resolution {
    let mut warnings = Vec::new();
    let mut host = ServerConfig::DEFAULT_HOST.to_string();
    let mut port = ServerConfig::DEFAULT_PORT;

    if let Some(path) = ini_path {
        if let Some(ini_port) = read_ini_port(path, &mut warnings) {
            port = ini_port;
        }
    }

    if network.enable_manual_connection {
        let manual_host = network.host.trim();
        if manual_host.is_empty() {
            warnings.push(AddressWarning::ManualHostEmpty);
        } else {
            host = manual_host.to_string();
        }

        let manual_port = network.port.trim();
        if manual_port.is_empty() {
            warnings.push(AddressWarning::ManualPortEmpty);
        } else {
            match parse_port(manual_port) {
                Some(p) => port = p,
                None => warnings.push(AddressWarning::ManualPortInvalid {
                    value: manual_port.to_string(),
                }),
            }
        }
    }

    let address = ConnectionAddress { host, port };
    debug!(
        "Resolved listener address {} ({} fallbacks)",
        address,
        warnings.len()
    );

    Resolution { address, warnings }
}

fn read_ini_port(path: &Path, warnings: &mut Vec<AddressWarning>) -> Option<u16> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warnings.push(AddressWarning::IniUnreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
            return None;
        }
    };

    match lookup_server_port(&content) {
        PortLookup::Missing => None,
        PortLookup::Malformed(entry) => {
            warnings.push(AddressWarning::IniPortInvalid {
                path: path.to_path_buf(),
                entry,
            });
            None
        }
        PortLookup::Found(value) => match ConnectionAddress::new("", value) {
            Ok(addr) => Some(addr.port()),
            Err(_) => {
                warnings.push(AddressWarning::IniPortInvalid {
                    path: path.to_path_buf(),
                    entry: format!("{}={}", ServerConfig::INI_PORT_KEY, value),
                });
                None
            }
        },
    }
}

fn parse_port(value: &str) -> Option<u16> {
    value
        .parse::<u64>()
        .ok()
        .and_then(|p| ConnectionAddress::new("", p).ok())
        .map(|addr| addr.port())
}
