//! The socket bridge: handle table, operation dispatch, and ordered
//! event delivery glued to one async runtime.
//!
//! # Overview
//!
//! Downward, the bridge resolves a [`SocketHandle`], validates the
//! operation against the connection state machine, and forwards it to
//! the registered [`SocketTransport`]. Upward, the transport reports
//! through the [`SocketEventSink`] implementation on the bridge itself;
//! each event is validated, queued on the connection's bounded channel,
//! and drained by a single pump task that awaits the consumer sink one
//! event at a time, so the consumer observes a strict per-connection
//! order.
//!
//! Both directions are fire-and-forget. A call that cannot proceed
//! (unknown handle, state that does not admit it, transport refusal) is
//! logged and dropped; nothing is surfaced to the caller, because by the
//! time the caller could react the connection is already gone.

use crate::binder::ExecutionBinder;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::registry::{HandleRegistry, SocketEntry};
use crate::state::{ConnectionState, EventKind, OpKind};
use bridge_traits::{
    CloseDescriptor, FactoryContext, Frame, FramingMode, OptionsBlob, SocketAddress,
    SocketEventSink, SocketHandle, SocketTransport,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One upward event, queued between validation and consumer delivery.
#[derive(Debug)]
pub(crate) enum QueuedEvent {
    GotHttpResponse { status: u16, headers: OptionsBlob },
    Opened,
    Received { frame: Frame },
    CompletedWrite { byte_count: u64 },
    CloseRequested { status: i32, message: String },
    Closed { descriptor: CloseDescriptor },
}

impl QueuedEvent {
    fn kind(&self) -> EventKind {
        match self {
            QueuedEvent::GotHttpResponse { .. } => EventKind::GotHttpResponse,
            QueuedEvent::Opened => EventKind::Opened,
            QueuedEvent::Received { .. } => EventKind::Received,
            QueuedEvent::CompletedWrite { .. } => EventKind::CompletedWrite,
            QueuedEvent::CloseRequested { .. } => EventKind::CloseRequested,
            QueuedEvent::Closed { .. } => EventKind::Closed,
        }
    }
}

/// Cross-runtime socket bridge. Cheap to share; all methods take
/// `&self`.
pub struct SocketBridge {
    registry: HandleRegistry,
    transport: Arc<dyn SocketTransport>,
    sink: Arc<dyn SocketEventSink>,
    framing: FramingMode,
    context: FactoryContext,
    queue_capacity: usize,
    binder: ExecutionBinder,
}

impl SocketBridge {
    /// Builds the bridge and wires itself into the transport as its
    /// event sink. Must be called inside the runtime that will carry
    /// the pump tasks; use [`SocketBridge::with_binder`] elsewhere.
    pub fn new(config: BridgeConfig) -> Result<Arc<Self>> {
        let binder = ExecutionBinder::try_current()?;
        Self::with_binder(config, binder)
    }

    pub fn with_binder(config: BridgeConfig, binder: ExecutionBinder) -> Result<Arc<Self>> {
        let bridge = Arc::new(Self {
            registry: HandleRegistry::new(),
            transport: Arc::clone(&config.transport),
            sink: Arc::clone(&config.event_sink),
            framing: config.framing,
            context: Arc::clone(&config.factory_context),
            queue_capacity: config.event_queue_capacity,
            binder,
        });
        bridge
            .transport
            .attach_event_sink(Arc::clone(&bridge) as Arc<dyn SocketEventSink>);
        Ok(bridge)
    }

    // ========================================================================
    // Downward operations
    // ========================================================================

    /// Opens a connection to `address`. The returned handle is live
    /// immediately, in the opening state; the outcome arrives as an
    /// `opened` or `closed` event.
    pub async fn open(&self, address: SocketAddress, options: OptionsBlob) -> SocketHandle {
        self.open_with(
            Arc::clone(&self.transport),
            Arc::clone(&self.context),
            address,
            options,
            self.framing,
        )
        .await
    }

    /// Registers a connection whose transport side already exists, as
    /// when the far runtime initiated it. The entry starts in the
    /// opening state and no `open` call is made on the transport.
    pub fn from_native(
        &self,
        transport: Arc<dyn SocketTransport>,
        context: FactoryContext,
        address: SocketAddress,
        framing: FramingMode,
    ) -> SocketHandle {
        let entry = self.register_entry(transport, context, address, framing);
        debug!(handle = %entry.handle, address = %entry.address, "adopted native connection");
        entry.handle
    }

    /// Sends one frame. Valid only while open; anything else is dropped.
    pub async fn write(&self, handle: SocketHandle, frame: Frame) {
        let Some(entry) = self.resolve(handle, "write") else {
            return;
        };
        if !self.apply_op(&entry, OpKind::Write) {
            return;
        }
        if let Err(e) = entry.transport.write(&entry.context, handle, frame).await {
            warn!(%handle, error = %e, "transport rejected write");
        }
    }

    /// Returns `byte_count` bytes of receive credit to the transport.
    pub async fn acknowledge_received(&self, handle: SocketHandle, byte_count: u64) {
        let Some(entry) = self.resolve(handle, "acknowledge_received") else {
            return;
        };
        if !self.apply_op(&entry, OpKind::AcknowledgeReceived) {
            return;
        }
        if let Err(e) = entry
            .transport
            .acknowledge_received(&entry.context, handle, byte_count)
            .await
        {
            warn!(%handle, error = %e, "transport rejected acknowledge_received");
        }
    }

    /// Begins a graceful close handshake with the given status.
    pub async fn request_close(&self, handle: SocketHandle, status: i32, message: &str) {
        let Some(entry) = self.resolve(handle, "request_close") else {
            return;
        };
        if !self.apply_op(&entry, OpKind::RequestClose) {
            return;
        }
        if let Err(e) = entry
            .transport
            .request_close(&entry.context, handle, status, message)
            .await
        {
            warn!(%handle, error = %e, "transport rejected request_close");
        }
    }

    /// Closes the underlying connection immediately. The terminal
    /// outcome still arrives as a `closed` event.
    pub async fn close(&self, handle: SocketHandle, descriptor: &CloseDescriptor) {
        let Some(entry) = self.resolve(handle, "close") else {
            return;
        };
        if !self.apply_op(&entry, OpKind::Close) {
            return;
        }
        if let Err(e) = entry.transport.close(&entry.context, handle, descriptor).await {
            warn!(%handle, error = %e, "transport rejected close");
        }
    }

    /// Releases the handle. Valid only after `closed` was delivered;
    /// afterwards the handle no longer resolves.
    pub async fn dispose(&self, handle: SocketHandle) {
        let Some(entry) = self.resolve(handle, "dispose") else {
            return;
        };
        if !self.apply_op(&entry, OpKind::Dispose) {
            return;
        }
        if let Err(e) = entry.transport.dispose(&entry.context, handle).await {
            warn!(%handle, error = %e, "transport rejected dispose");
        }
        // Removing the entry drops the queue sender, which ends the
        // pump task once the queue drains.
        self.registry.unregister(handle);
        debug!(%handle, "handle disposed");
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn state(&self, handle: SocketHandle) -> Option<ConnectionState> {
        self.registry.resolve(handle).map(|e| e.state())
    }

    pub fn framing(&self, handle: SocketHandle) -> Option<FramingMode> {
        self.registry.resolve(handle).map(|e| e.framing)
    }

    pub fn address(&self, handle: SocketHandle) -> Option<SocketAddress> {
        self.registry.resolve(handle).map(|e| e.address.clone())
    }

    /// Number of handles not yet disposed.
    pub fn active_connections(&self) -> usize {
        self.registry.len()
    }

    /// Entry point for threads outside the async runtime.
    pub fn blocking(self: &Arc<Self>) -> BlockingBridge {
        BlockingBridge {
            bridge: Arc::clone(self),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn open_with(
        &self,
        transport: Arc<dyn SocketTransport>,
        context: FactoryContext,
        address: SocketAddress,
        options: OptionsBlob,
        framing: FramingMode,
    ) -> SocketHandle {
        let entry = self.register_entry(Arc::clone(&transport), context, address, framing);
        let handle = entry.handle;
        debug!(%handle, address = %entry.address, ?framing, "opening connection");
        if let Err(e) = transport
            .open(&entry.context, handle, &entry.address, &options)
            .await
        {
            warn!(%handle, error = %e, "transport rejected open");
        }
        handle
    }

    /// Creates the entry, its event queue, and the pump task, then
    /// publishes the handle. The entry is resolvable before any
    /// transport call is made so that events raised during `open`
    /// already find it.
    fn register_entry(
        &self,
        transport: Arc<dyn SocketTransport>,
        context: FactoryContext,
        address: SocketAddress,
        framing: FramingMode,
    ) -> Arc<SocketEntry> {
        let handle = self.registry.allocate();
        let (events_tx, events_rx) = mpsc::channel(self.queue_capacity);
        let entry = Arc::new(SocketEntry::new(
            handle, address, framing, transport, context, events_tx,
        ));
        self.registry.register(Arc::clone(&entry));
        self.binder
            .spawn(Self::pump(handle, events_rx, Arc::clone(&self.sink)));
        entry
    }

    fn resolve(&self, handle: SocketHandle, what: &'static str) -> Option<Arc<SocketEntry>> {
        let entry = self.registry.resolve(handle);
        if entry.is_none() {
            debug!(%handle, operation = what, "dropping call for unknown handle");
        }
        entry
    }

    fn apply_op(&self, entry: &SocketEntry, op: OpKind) -> bool {
        match entry.transition_op(op) {
            Ok(_) => true,
            Err(state) => {
                warn!(
                    handle = %entry.handle,
                    ?state,
                    operation = op.name(),
                    "dropping operation not valid in current state"
                );
                false
            }
        }
    }

    /// Validates, transitions, and enqueues one upward event.
    ///
    /// Queue capacity is reserved before admission so that the state
    /// transition and the enqueue happen as one step under the entry
    /// lock; an event admitted while open can never land in the queue
    /// behind a racing terminal event. Backpressure is applied here, at
    /// the reservation, before any state is consulted.
    async fn deliver(&self, handle: SocketHandle, event: QueuedEvent) {
        let kind = event.kind();
        let Some(entry) = self.registry.resolve(handle) else {
            debug!(%handle, event = kind.name(), "dropping event for unknown handle");
            return;
        };
        let Ok(permit) = entry.events_tx.reserve().await else {
            warn!(%handle, event = kind.name(), "event queue closed; dropping event");
            return;
        };
        if let Err(state) = entry.admit_event(kind, event, permit) {
            warn!(
                %handle,
                ?state,
                event = kind.name(),
                "dropping event not valid in current state"
            );
        }
    }

    /// Drains one connection's queue into the consumer sink, one event
    /// at a time. Ends when the entry is unregistered and the queue has
    /// drained.
    async fn pump(
        handle: SocketHandle,
        mut events_rx: mpsc::Receiver<QueuedEvent>,
        sink: Arc<dyn SocketEventSink>,
    ) {
        while let Some(event) = events_rx.recv().await {
            match event {
                QueuedEvent::GotHttpResponse { status, headers } => {
                    sink.got_http_response(handle, status, headers).await;
                }
                QueuedEvent::Opened => sink.opened(handle).await,
                QueuedEvent::Received { frame } => sink.received(handle, frame).await,
                QueuedEvent::CompletedWrite { byte_count } => {
                    sink.completed_write(handle, byte_count).await;
                }
                QueuedEvent::CloseRequested { status, message } => {
                    sink.close_requested(handle, status, message).await;
                }
                QueuedEvent::Closed { descriptor } => sink.closed(handle, descriptor).await,
            }
        }
        debug!(%handle, "event pump finished");
    }
}

/// Transport-facing surface: validate, transition, enqueue.
#[async_trait::async_trait]
impl SocketEventSink for SocketBridge {
    async fn got_http_response(&self, handle: SocketHandle, status: u16, headers: OptionsBlob) {
        self.deliver(handle, QueuedEvent::GotHttpResponse { status, headers })
            .await;
    }

    async fn opened(&self, handle: SocketHandle) {
        self.deliver(handle, QueuedEvent::Opened).await;
    }

    async fn received(&self, handle: SocketHandle, frame: Frame) {
        self.deliver(handle, QueuedEvent::Received { frame }).await;
    }

    async fn completed_write(&self, handle: SocketHandle, byte_count: u64) {
        self.deliver(handle, QueuedEvent::CompletedWrite { byte_count })
            .await;
    }

    async fn close_requested(&self, handle: SocketHandle, status: i32, message: String) {
        self.deliver(handle, QueuedEvent::CloseRequested { status, message })
            .await;
    }

    async fn closed(&self, handle: SocketHandle, descriptor: CloseDescriptor) {
        self.deliver(handle, QueuedEvent::Closed { descriptor }).await;
    }
}

/// Synchronous facade over [`SocketBridge`] for foreign threads. Every
/// method re-enters the bound runtime and parks the caller until the
/// dispatch completes; calling from inside the runtime is an error.
pub struct BlockingBridge {
    bridge: Arc<SocketBridge>,
}

impl BlockingBridge {
    pub fn open(&self, address: SocketAddress, options: OptionsBlob) -> Result<SocketHandle> {
        self.bridge
            .binder
            .block_on(self.bridge.open(address, options))
    }

    pub fn write(&self, handle: SocketHandle, frame: Frame) -> Result<()> {
        self.bridge.binder.block_on(self.bridge.write(handle, frame))
    }

    pub fn acknowledge_received(&self, handle: SocketHandle, byte_count: u64) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.acknowledge_received(handle, byte_count))
    }

    pub fn request_close(&self, handle: SocketHandle, status: i32, message: &str) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.request_close(handle, status, message))
    }

    pub fn close(&self, handle: SocketHandle, descriptor: &CloseDescriptor) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.close(handle, descriptor))
    }

    pub fn dispose(&self, handle: SocketHandle) -> Result<()> {
        self.bridge.binder.block_on(self.bridge.dispose(handle))
    }

    // Upward events, for transports that report from plain OS threads.

    pub fn got_http_response(
        &self,
        handle: SocketHandle,
        status: u16,
        headers: OptionsBlob,
    ) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.got_http_response(handle, status, headers))
    }

    pub fn opened(&self, handle: SocketHandle) -> Result<()> {
        self.bridge.binder.block_on(self.bridge.opened(handle))
    }

    pub fn received(&self, handle: SocketHandle, frame: Frame) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.received(handle, frame))
    }

    pub fn completed_write(&self, handle: SocketHandle, byte_count: u64) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.completed_write(handle, byte_count))
    }

    pub fn close_requested(
        &self,
        handle: SocketHandle,
        status: i32,
        message: String,
    ) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.close_requested(handle, status, message))
    }

    pub fn closed(&self, handle: SocketHandle, descriptor: CloseDescriptor) -> Result<()> {
        self.bridge
            .binder
            .block_on(self.bridge.closed(handle, descriptor))
    }
}
