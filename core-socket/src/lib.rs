//! Core socket bridge runtime.
//!
//! # Overview
//!
//! This crate owns everything between a [`SocketTransport`] and the
//! consumer that drives it from another runtime:
//!
//! - [`bridge::SocketBridge`]: handle table, state machine enforcement,
//!   downward dispatch, and ordered upward delivery.
//! - [`binder::ExecutionBinder`]: pins one tokio runtime and re-enters
//!   it from foreign threads.
//! - [`codec`]: binary marshalling of the connection target and opaque
//!   blobs for out-of-process transports.
//! - [`config::BridgeConfig`]: capability injection with fail-fast
//!   validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use core_socket::{BridgeConfig, SocketBridge};
//!
//! let config = BridgeConfig::builder()
//!     .with_transport(transport)
//!     .with_event_sink(sink)
//!     .build()?;
//! let bridge = SocketBridge::new(config)?;
//! let handle = bridge.open(address, options).await;
//! ```
//!
//! [`SocketTransport`]: bridge_traits::SocketTransport

pub mod binder;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod state;

mod registry;
#[cfg(test)]
pub(crate) mod testing;

pub use binder::ExecutionBinder;
pub use bridge::{BlockingBridge, SocketBridge};
pub use codec::{
    decode_headers, decode_open, encode_headers, encode_open, CodecError, OpenEnvelope,
    CODEC_VERSION,
};
pub use config::{BridgeConfig, BridgeConfigBuilder, DEFAULT_EVENT_QUEUE_CAPACITY};
pub use error::{Result, SocketError};
pub use state::ConnectionState;
