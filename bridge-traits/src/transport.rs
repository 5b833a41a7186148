//! Transport Factory Abstraction
//!
//! The downward half of the bridge: operations the engine issues against
//! a connection, implemented by the platform transport.

use crate::{
    error::Result,
    events::SocketEventSink,
    types::{CloseDescriptor, Frame, OptionsBlob, SocketAddress, SocketHandle},
};
use std::any::Any;
use std::sync::Arc;

/// Opaque per-factory context value, passed through to every transport
/// call unchanged. Transports downcast it to whatever they registered.
pub type FactoryContext = Arc<dyn Any + Send + Sync>;

/// Socket transport factory trait.
///
/// Each operation takes the connection handle plus its payload and is
/// fire-and-forget from the bridge's perspective: outcomes are observed
/// asynchronously via [`SocketEventSink`] events, never via the return
/// value. A returned error means the call itself could not be handed to
/// the transport; the bridge logs it and drops the operation.
///
/// Implementations must return quickly, queuing actual I/O elsewhere -
/// no operation may block indefinitely.
///
/// # Flow control
///
/// Every accepted `write` must eventually be answered by exactly one
/// `completed_write(byte_count)` on the event sink, in the order the
/// writes were issued. `acknowledge_received` tells the transport how
/// many previously delivered bytes the engine has consumed, bounding the
/// transport's read-ahead.
#[async_trait::async_trait]
pub trait SocketTransport: Send + Sync {
    /// Called once at bridge construction with the sink the transport
    /// must report upward events into. The sink is the bridge itself; it
    /// validates state and serializes delivery per handle.
    fn attach_event_sink(&self, sink: Arc<dyn SocketEventSink>);

    /// Open a connection to `address`. The options blob is interpreted
    /// only by the transport.
    async fn open(
        &self,
        ctx: &FactoryContext,
        handle: SocketHandle,
        address: &SocketAddress,
        options: &OptionsBlob,
    ) -> Result<()>;

    /// Send one frame. Ownership of the frame transfers to the
    /// transport.
    async fn write(&self, ctx: &FactoryContext, handle: SocketHandle, frame: Frame) -> Result<()>;

    /// Report that `byte_count` previously delivered bytes have been
    /// consumed by the engine.
    async fn acknowledge_received(
        &self,
        ctx: &FactoryContext,
        handle: SocketHandle,
        byte_count: u64,
    ) -> Result<()>;

    /// Ask the transport to begin a graceful shutdown handshake.
    async fn request_close(
        &self,
        ctx: &FactoryContext,
        handle: SocketHandle,
        status: i32,
        message: &str,
    ) -> Result<()>;

    /// Unconditional close with a locally-decided cause.
    async fn close(
        &self,
        ctx: &FactoryContext,
        handle: SocketHandle,
        descriptor: &CloseDescriptor,
    ) -> Result<()>;

    /// Release the transport's interest in the handle. Always the last
    /// call the transport sees for a handle.
    async fn dispose(&self, ctx: &FactoryContext, handle: SocketHandle) -> Result<()>;
}
