//! # Socket Bridge Traits
//!
//! Contracts between the replication engine's socket bridge and the
//! platform transport that actually moves bytes.
//!
//! ## Overview
//!
//! This crate defines both sides of the boundary:
//!
//! - [`SocketTransport`](transport::SocketTransport) - the downward
//!   target: six fire-and-forget operations (open, write,
//!   acknowledge-received, request-close, close, dispose) implemented by
//!   the platform transport (TLS negotiation, HTTP upgrade, proxying).
//! - [`SocketEventSink`](events::SocketEventSink) - the upward target:
//!   six events (got-HTTP-response, opened, received, completed-write,
//!   close-requested, closed) invoked by the transport at will, from any
//!   thread it owns.
//!
//! The bridge core (`core-socket`) sits between the two: it resolves
//! connection handles, enforces the connection state machine, and
//! serializes upward delivery per handle. Transports never talk to the
//! engine directly and vice versa.
//!
//! ## Handle lifetime
//!
//! A [`SocketHandle`](types::SocketHandle) identifies one logical
//! connection on both sides of the boundary. It is valid for downward
//! operations from `open` until `dispose`, and for upward events from
//! `open` until `closed`. Calls that race past those brackets are
//! dropped by the bridge, never surfaced as errors.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` bounds. Transport implementations
//! may invoke the event sink from their own thread pools; the bridge
//! guarantees per-handle ordering of delivery regardless.

pub mod error;
pub mod events;
pub mod transport;
pub mod types;

pub use error::BridgeError;

// Re-export commonly used types
pub use events::SocketEventSink;
pub use transport::{FactoryContext, SocketTransport};
pub use types::{
    CloseDescriptor, ErrorDomain, Frame, FramingMode, OptionsBlob, SocketAddress, SocketHandle,
};
