//! Nuke Bridge - run code inside Nuke from an editor.
//!
//! Talks to the NukeServerSocket listener running inside Nuke: the listener
//! address is resolved from defaults, the INI file the listener writes and
//! the user's manual connection override; the code is sent as a JSON
//! request over a fresh TCP connection and the single response is written
//! to an output log.
//!
//! # Example
//!
//! ```rust,ignore
//! use nuke_bridge::{MemorySink, RemoteExecService, Settings, TracingNotifier};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> nuke_bridge::Result<()> {
//!     let sink = Arc::new(MemorySink::new());
//!     let service = RemoteExecService::new(
//!         Settings::default(),
//!         sink.clone(),
//!         Arc::new(TracingNotifier),
//!     );
//!
//!     service.run_code("", "print(nuke.root().name())").await?;
//!     println!("{:?}", sink.lines());
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod config;
pub mod document;
pub mod error;
pub mod ini;
pub mod output;
pub mod platform;
pub mod remote;
pub mod service;

// Re-export commonly used types
pub use address::{resolve_address, AddressWarning, ConnectionAddress, Resolution};
pub use config::{Framing, NetworkSettings, OutputSettings, Settings, TransportSettings};
pub use document::{ActiveDocument, DocumentSnapshot, FileDocument};
pub use error::{BridgeError, Result};
pub use output::{
    MemoryNotifier, MemorySink, Notification, Notifier, OutputSink, TracingNotifier, WriterSink,
};
pub use remote::{ClientOptions, ExecutionRequest, ExecutionResult, RemoteExecClient};
pub use service::{RemoteExecService, TEST_CONNECTION_SCRIPT};
