//! Remote execution over TCP.
//!
//! Sends a script to the NukeServerSocket listener running inside Nuke and
//! collects the single response it sends back.
//!
//! # Architecture
//!
//! - **Protocol**: request type and the framing modes for both directions
//! - **Client**: one connection per exchange, serialized per client

pub mod client;
pub mod protocol;

pub use client::{ClientOptions, ExecutionResult, RemoteExecClient};
pub use protocol::ExecutionRequest;
