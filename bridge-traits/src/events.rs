//! Upward Event Sink
//!
//! The upward half of the bridge: events the transport reports about a
//! connection, possibly from threads unknown to the engine's runtime.

use crate::types::{CloseDescriptor, Frame, OptionsBlob, SocketHandle};

/// Socket event sink trait.
///
/// Implemented twice: by the bridge core (the surface handed to the
/// transport, which validates the connection state and serializes
/// delivery per handle) and by the engine (the final callbacks). Events
/// for unknown or already-closed handles are dropped by the bridge, so
/// engine implementations only ever observe a valid sequence:
/// at most one `got_http_response`, exactly one `opened`, any number of
/// `received`/`completed_write`, at most one `close_requested`, exactly
/// one terminal `closed`.
///
/// None of the methods return a value: the remote side has no
/// synchronous channel to be informed of a delivery failure, so
/// implementations must handle their own errors internally.
#[async_trait::async_trait]
pub trait SocketEventSink: Send + Sync {
    /// Informational HTTP response from the connection handshake.
    /// Zero or one occurrence, before `opened`. The headers blob is
    /// opaque to the bridge.
    async fn got_http_response(&self, handle: SocketHandle, status: u16, headers: OptionsBlob);

    /// The connection is established.
    async fn opened(&self, handle: SocketHandle);

    /// One frame arrived from the remote peer. Frames are delivered in
    /// the order the peer sent them.
    async fn received(&self, handle: SocketHandle, frame: Frame);

    /// One previously issued `write` completed. Completions arrive in
    /// the same order as the writes (FIFO).
    async fn completed_write(&self, handle: SocketHandle, byte_count: u64);

    /// The remote peer asked for a graceful shutdown. Advisory only;
    /// the connection is not yet terminal.
    async fn close_requested(&self, handle: SocketHandle, status: i32, message: String);

    /// Terminal outcome of the connection, normal or not. After this no
    /// further events are delivered for the handle.
    async fn closed(&self, handle: SocketHandle, descriptor: CloseDescriptor);
}
