//! Loopback implementation of the transport capability.

use bridge_traits::error::Result;
use bridge_traits::{
    BridgeError, CloseDescriptor, ErrorDomain, FactoryContext, Frame, OptionsBlob, SocketAddress,
    SocketEventSink, SocketHandle, SocketTransport,
};
use core_socket::codec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, warn};

/// Hostname that simulates a connect failure. Opens against it are
/// answered with a POSIX `ECONNREFUSED` closed event instead of
/// `opened`.
pub const UNREACHABLE_HOST: &str = "unreachable.invalid";

/// POSIX errno for a refused connection.
const ECONNREFUSED: i32 = 111;

struct PeerState {
    address: SocketAddress,
    unacked: u64,
}

/// Echo transport: frames written to a connection come back as received
/// frames on the same connection.
#[derive(Default)]
pub struct LoopbackTransport {
    sink: OnceLock<Arc<dyn SocketEventSink>>,
    peers: Mutex<HashMap<SocketHandle, PeerState>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive credit consumed by `handle` and not yet returned via
    /// `acknowledge_received`. `None` once the peer is gone.
    pub fn pending_unacked(&self, handle: SocketHandle) -> Option<u64> {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .map(|p| p.unacked)
    }

    fn sink(&self) -> Result<&Arc<dyn SocketEventSink>> {
        self.sink.get().ok_or_else(|| {
            BridgeError::NotAvailable("no event sink attached to loopback transport".to_string())
        })
    }

    fn handshake_headers() -> Result<OptionsBlob> {
        codec::encode_headers(&[
            ("Upgrade".to_string(), "websocket".to_string()),
            ("Connection".to_string(), "Upgrade".to_string()),
        ])
        .map_err(|e| BridgeError::OperationFailed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl SocketTransport for LoopbackTransport {
    fn attach_event_sink(&self, sink: Arc<dyn SocketEventSink>) {
        if self.sink.set(sink).is_err() {
            warn!("event sink already attached; ignoring replacement");
        }
    }

    async fn open(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        address: &SocketAddress,
        options: &OptionsBlob,
    ) -> Result<()> {
        let sink = self.sink()?;

        // Round-trip through the wire codec, exactly as if the open had
        // crossed a process boundary.
        let encoded = codec::encode_open(address, options)
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        let envelope = codec::decode_open(&encoded)
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        debug!(%handle, address = %envelope.address, "loopback open");

        if envelope.address.hostname == UNREACHABLE_HOST {
            sink.closed(
                handle,
                CloseDescriptor {
                    domain: ErrorDomain::Posix,
                    code: ECONNREFUSED,
                    message: "connection refused".to_string(),
                },
            )
            .await;
            return Ok(());
        }

        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                handle,
                PeerState {
                    address: envelope.address,
                    unacked: 0,
                },
            );

        sink.got_http_response(handle, 101, Self::handshake_headers()?)
            .await;
        sink.opened(handle).await;
        Ok(())
    }

    async fn write(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        frame: Frame,
    ) -> Result<()> {
        let sink = self.sink()?;
        let byte_count = frame.as_slice().len() as u64;
        {
            let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
            let peer = peers.get_mut(&handle).ok_or_else(|| {
                BridgeError::OperationFailed(format!("no loopback peer for {handle}"))
            })?;
            // The echoed frame consumes receive credit until the
            // consumer acknowledges it.
            peer.unacked += byte_count;
        }

        sink.completed_write(handle, byte_count).await;
        sink.received(handle, frame).await;
        Ok(())
    }

    async fn acknowledge_received(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        byte_count: u64,
    ) -> Result<()> {
        let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(peer) = peers.get_mut(&handle) {
            peer.unacked = peer.unacked.saturating_sub(byte_count);
        }
        Ok(())
    }

    async fn request_close(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        status: i32,
        message: &str,
    ) -> Result<()> {
        // The loopback peer confirms the handshake immediately; the
        // status and message come back verbatim in the terminal event.
        let sink = self.sink()?;
        sink.closed(
            handle,
            CloseDescriptor {
                domain: ErrorDomain::WebSocket,
                code: status,
                message: message.to_string(),
            },
        )
        .await;
        Ok(())
    }

    async fn close(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        descriptor: &CloseDescriptor,
    ) -> Result<()> {
        let sink = self.sink()?;
        sink.closed(handle, descriptor.clone()).await;
        Ok(())
    }

    async fn dispose(&self, _ctx: &FactoryContext, handle: SocketHandle) -> Result<()> {
        let removed = self
            .peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if let Some(peer) = removed {
            debug!(%handle, address = %peer.address, "loopback peer disposed");
        }
        Ok(())
    }
}
