//! Error types for Nuke Bridge.
//!
//! Network failures are terminal for the request that hit them and are
//! reported to the user. Address resolution problems are not errors at all;
//! see [`crate::address::AddressWarning`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the Nuke Bridge library.
#[derive(Debug, Error)]
pub enum BridgeError {
    // Network errors
    #[error("Could not reach the Nuke listener at {address}: {message}")]
    Connection {
        address: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("No response from {address} after {after:?}")]
    Timeout { address: String, after: Duration },

    #[error("Listener at {address} closed the connection without a response")]
    EmptyResponse { address: String },

    #[error("Response of {size} bytes exceeds maximum {max}")]
    ResponseTooLarge { size: usize, max: usize },

    // Programming errors
    #[error("Port {port} is outside the valid range 1-65535")]
    PortOutOfRange { port: u64 },

    #[error("No active document to execute")]
    NoActiveDocument,

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Nuke Bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BridgeError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a connection error for `address` from a socket failure.
    pub fn connection(address: impl Into<String>, err: std::io::Error) -> Self {
        BridgeError::Connection {
            address: address.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Whether this error came from the network rather than from the caller
    /// or the configuration.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            BridgeError::Connection { .. }
                | BridgeError::Timeout { .. }
                | BridgeError::EmptyResponse { .. }
                | BridgeError::ResponseTooLarge { .. }
        )
    }

    /// Message shown to the user when a request fails.
    ///
    /// Network failures point at the manual connection settings since a
    /// wrong host or port is the usual cause.
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::Connection { address, .. } => format!(
                "Couldn't connect to NukeServerSocket at {}. Check that the server is running \
                 inside Nuke, or review the manual connection settings (host and port).",
                address
            ),
            BridgeError::Timeout { address, after } => format!(
                "NukeServerSocket at {} did not answer within {:.1}s. \
                 The code may still be running inside Nuke.",
                address,
                after.as_secs_f64()
            ),
            other => other.to_string(),
        }
    }
}
