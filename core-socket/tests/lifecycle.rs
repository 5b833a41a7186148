//! End-to-end lifecycle coverage: downward dispatch, state enforcement,
//! and ordered upward delivery through the pump task.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    CloseDescriptor, ErrorDomain, FactoryContext, Frame, OptionsBlob, SocketAddress,
    SocketEventSink, SocketHandle, SocketTransport,
};
use core_socket::{BridgeConfig, ConnectionState, SocketBridge};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TransportOp {
    Open(SocketHandle),
    Write(SocketHandle, Vec<u8>),
    RequestClose(SocketHandle, i32, String),
    Close(SocketHandle, CloseDescriptor),
    Dispose(SocketHandle),
}

#[derive(Default)]
struct RecordingTransport {
    ops: Mutex<Vec<TransportOp>>,
}

impl RecordingTransport {
    fn ops(&self) -> Vec<TransportOp> {
        self.ops.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SocketTransport for RecordingTransport {
    fn attach_event_sink(&self, _sink: Arc<dyn SocketEventSink>) {}

    async fn open(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        _address: &SocketAddress,
        _options: &OptionsBlob,
    ) -> BridgeResult<()> {
        self.ops.lock().unwrap().push(TransportOp::Open(handle));
        Ok(())
    }

    async fn write(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        frame: Frame,
    ) -> BridgeResult<()> {
        self.ops
            .lock()
            .unwrap()
            .push(TransportOp::Write(handle, frame.as_slice().to_vec()));
        Ok(())
    }

    async fn acknowledge_received(
        &self,
        _ctx: &FactoryContext,
        _handle: SocketHandle,
        _byte_count: u64,
    ) -> BridgeResult<()> {
        Ok(())
    }

    async fn request_close(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        status: i32,
        message: &str,
    ) -> BridgeResult<()> {
        self.ops
            .lock()
            .unwrap()
            .push(TransportOp::RequestClose(handle, status, message.to_string()));
        Ok(())
    }

    async fn close(
        &self,
        _ctx: &FactoryContext,
        handle: SocketHandle,
        descriptor: &CloseDescriptor,
    ) -> BridgeResult<()> {
        self.ops
            .lock()
            .unwrap()
            .push(TransportOp::Close(handle, descriptor.clone()));
        Ok(())
    }

    async fn dispose(&self, _ctx: &FactoryContext, handle: SocketHandle) -> BridgeResult<()> {
        self.ops.lock().unwrap().push(TransportOp::Dispose(handle));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SinkEvent {
    HttpResponse(SocketHandle, u16),
    Opened(SocketHandle),
    Received(SocketHandle, Vec<u8>),
    CompletedWrite(SocketHandle, u64),
    CloseRequested(SocketHandle, i32, String),
    Closed(SocketHandle, CloseDescriptor),
}

struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait::async_trait]
impl SocketEventSink for ChannelSink {
    async fn got_http_response(&self, handle: SocketHandle, status: u16, _headers: OptionsBlob) {
        let _ = self.tx.send(SinkEvent::HttpResponse(handle, status));
    }

    async fn opened(&self, handle: SocketHandle) {
        let _ = self.tx.send(SinkEvent::Opened(handle));
    }

    async fn received(&self, handle: SocketHandle, frame: Frame) {
        let _ = self
            .tx
            .send(SinkEvent::Received(handle, frame.as_slice().to_vec()));
    }

    async fn completed_write(&self, handle: SocketHandle, byte_count: u64) {
        let _ = self.tx.send(SinkEvent::CompletedWrite(handle, byte_count));
    }

    async fn close_requested(&self, handle: SocketHandle, status: i32, message: String) {
        let _ = self
            .tx
            .send(SinkEvent::CloseRequested(handle, status, message));
    }

    async fn closed(&self, handle: SocketHandle, descriptor: CloseDescriptor) {
        let _ = self.tx.send(SinkEvent::Closed(handle, descriptor));
    }
}

struct Harness {
    bridge: Arc<SocketBridge>,
    transport: Arc<RecordingTransport>,
    events: mpsc::UnboundedReceiver<SinkEvent>,
}

impl Harness {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let transport = Arc::new(RecordingTransport::default());
        let (sink, events) = ChannelSink::new();
        let config = BridgeConfig::builder()
            .with_transport(Arc::clone(&transport) as Arc<dyn SocketTransport>)
            .with_event_sink(sink)
            .build()
            .unwrap();
        let bridge = SocketBridge::new(config).unwrap();
        Self {
            bridge,
            transport,
            events,
        }
    }

    async fn next_event(&mut self) -> SinkEvent {
        tokio::time::timeout(Duration::from_secs(1), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn assert_no_event(&mut self) {
        let outcome = tokio::time::timeout(Duration::from_millis(50), self.events.recv()).await;
        assert!(outcome.is_err(), "unexpected event: {:?}", outcome.unwrap());
    }
}

fn address() -> SocketAddress {
    SocketAddress::new("wss", "example.com", 443, "/sync").unwrap()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let mut h = Harness::new();

    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    assert_eq!(h.bridge.state(handle), Some(ConnectionState::Opening));
    assert_eq!(h.bridge.active_connections(), 1);

    h.bridge.got_http_response(handle, 101, OptionsBlob::default()).await;
    h.bridge.opened(handle).await;
    assert_eq!(h.next_event().await, SinkEvent::HttpResponse(handle, 101));
    assert_eq!(h.next_event().await, SinkEvent::Opened(handle));
    assert_eq!(h.bridge.state(handle), Some(ConnectionState::Open));

    h.bridge.write(handle, Frame::from_static(b"payload")).await;
    h.bridge.completed_write(handle, 7).await;
    assert_eq!(h.next_event().await, SinkEvent::CompletedWrite(handle, 7));

    h.bridge.request_close(handle, 1000, "done").await;
    assert_eq!(h.bridge.state(handle), Some(ConnectionState::Closing));

    let descriptor = CloseDescriptor {
        domain: ErrorDomain::WebSocket,
        code: 1000,
        message: "done".to_string(),
    };
    h.bridge.closed(handle, descriptor.clone()).await;
    // Descriptor arrives at the consumer verbatim.
    assert_eq!(h.next_event().await, SinkEvent::Closed(handle, descriptor));
    assert_eq!(h.bridge.state(handle), Some(ConnectionState::Closed));

    h.bridge.dispose(handle).await;
    assert_eq!(h.bridge.state(handle), None);
    assert_eq!(h.bridge.active_connections(), 0);

    assert_eq!(
        h.transport.ops(),
        vec![
            TransportOp::Open(handle),
            TransportOp::Write(handle, b"payload".to_vec()),
            TransportOp::RequestClose(handle, 1000, "done".to_string()),
            TransportOp::Dispose(handle),
        ]
    );
}

#[tokio::test]
async fn test_events_are_delivered_in_order() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    h.bridge.opened(handle).await;

    for i in 0..20u64 {
        h.bridge.completed_write(handle, i).await;
    }

    assert_eq!(h.next_event().await, SinkEvent::Opened(handle));
    for i in 0..20u64 {
        assert_eq!(h.next_event().await, SinkEvent::CompletedWrite(handle, i));
    }
}

#[tokio::test]
async fn test_received_frames_flow_while_closing() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    h.bridge.opened(handle).await;
    h.bridge.close_requested(handle, 1001, "going away".to_string()).await;
    assert_eq!(h.bridge.state(handle), Some(ConnectionState::Closing));

    // Frames already in flight still drain to the consumer.
    h.bridge.received(handle, Frame::from_static(b"tail")).await;

    assert_eq!(h.next_event().await, SinkEvent::Opened(handle));
    assert_eq!(
        h.next_event().await,
        SinkEvent::CloseRequested(handle, 1001, "going away".to_string())
    );
    assert_eq!(
        h.next_event().await,
        SinkEvent::Received(handle, b"tail".to_vec())
    );
}

#[tokio::test]
async fn test_connect_failure_short_circuits_to_closed() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;

    let refused = CloseDescriptor {
        domain: ErrorDomain::Posix,
        code: 111,
        message: "connection refused".to_string(),
    };
    h.bridge.closed(handle, refused.clone()).await;
    assert_eq!(h.bridge.state(handle), Some(ConnectionState::Closed));
    assert_eq!(h.next_event().await, SinkEvent::Closed(handle, refused));
}

#[tokio::test]
async fn test_write_after_closed_is_dropped() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    h.bridge.opened(handle).await;
    h.bridge.closed(handle, CloseDescriptor::normal()).await;

    h.bridge.write(handle, Frame::from_static(b"late")).await;
    assert!(!h
        .transport
        .ops()
        .contains(&TransportOp::Write(handle, b"late".to_vec())));
}

#[tokio::test]
async fn test_dispose_before_closed_is_dropped() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    h.bridge.opened(handle).await;

    h.bridge.dispose(handle).await;
    assert_eq!(h.bridge.state(handle), Some(ConnectionState::Open));
    assert!(!h.transport.ops().contains(&TransportOp::Dispose(handle)));
}

#[tokio::test]
async fn test_events_after_dispose_are_dropped_silently() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    h.bridge.opened(handle).await;
    h.bridge.closed(handle, CloseDescriptor::normal()).await;
    h.bridge.dispose(handle).await;

    // Drain the events produced before disposal.
    assert_eq!(h.next_event().await, SinkEvent::Opened(handle));
    assert!(matches!(h.next_event().await, SinkEvent::Closed(..)));

    // A straggler from the transport must not panic or reach the sink.
    h.bridge.received(handle, Frame::from_static(b"ghost")).await;
    h.assert_no_event().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_received_and_closed_never_reorder() {
    let mut h = Harness::new();
    const ROUNDS: usize = 64;

    for _ in 0..ROUNDS {
        let handle = h.bridge.open(address(), OptionsBlob::default()).await;
        h.bridge.opened(handle).await;

        // Submit a frame and the terminal event from two parallel tasks.
        let b1 = Arc::clone(&h.bridge);
        let b2 = Arc::clone(&h.bridge);
        let recv_task =
            tokio::spawn(async move { b1.received(handle, Frame::from_static(b"race")).await });
        let close_task =
            tokio::spawn(async move { b2.closed(handle, CloseDescriptor::normal()).await });
        recv_task.await.unwrap();
        close_task.await.unwrap();
    }

    // Whatever the interleaving, a frame must never be delivered after
    // the terminal event for its handle.
    let mut terminated = std::collections::HashSet::new();
    while terminated.len() < ROUNDS {
        match h.next_event().await {
            SinkEvent::Opened(_) => {}
            SinkEvent::Received(handle, _) => {
                assert!(
                    !terminated.contains(&handle),
                    "frame delivered after closed for {handle}"
                );
            }
            SinkEvent::Closed(handle, _) => {
                assert!(terminated.insert(handle), "duplicate closed for {handle}");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    h.assert_no_event().await;
}

#[tokio::test]
async fn test_second_http_response_is_dropped() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;

    h.bridge.got_http_response(handle, 101, OptionsBlob::default()).await;
    // A transport must report the handshake response at most once; a
    // repeat is a protocol error and is dropped.
    h.bridge.got_http_response(handle, 500, OptionsBlob::default()).await;
    h.bridge.opened(handle).await;

    assert_eq!(h.next_event().await, SinkEvent::HttpResponse(handle, 101));
    assert_eq!(h.next_event().await, SinkEvent::Opened(handle));
    h.assert_no_event().await;
}

#[tokio::test]
async fn test_duplicate_closed_is_delivered_once() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    h.bridge.opened(handle).await;

    h.bridge.closed(handle, CloseDescriptor::normal()).await;
    h.bridge.closed(handle, CloseDescriptor::normal()).await;

    assert_eq!(h.next_event().await, SinkEvent::Opened(handle));
    assert!(matches!(h.next_event().await, SinkEvent::Closed(..)));
    h.assert_no_event().await;
}

#[tokio::test]
async fn test_handles_are_independent() {
    let mut h = Harness::new();
    let a = h.bridge.open(address(), OptionsBlob::default()).await;
    let b = h.bridge.open(address(), OptionsBlob::default()).await;
    assert_ne!(a, b);

    h.bridge.opened(a).await;
    h.bridge.closed(a, CloseDescriptor::normal()).await;
    assert_eq!(h.bridge.state(a), Some(ConnectionState::Closed));
    // Closing one connection leaves the other untouched.
    assert_eq!(h.bridge.state(b), Some(ConnectionState::Opening));
    assert_eq!(h.bridge.active_connections(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_facade_from_foreign_thread() {
    let mut h = Harness::new();
    let handle = h.bridge.open(address(), OptionsBlob::default()).await;
    h.bridge.opened(handle).await;

    // A raw OS thread has no runtime context at all; the facade must
    // re-enter the bound runtime on its own, in both directions.
    let bridge = Arc::clone(&h.bridge);
    let joined = tokio::task::spawn_blocking(move || {
        std::thread::spawn(move || {
            let facade = bridge.blocking();
            facade
                .write(handle, Frame::from_static(b"from foreign thread"))
                .and_then(|_| facade.completed_write(handle, 19))
        })
        .join()
        .unwrap()
    })
    .await
    .unwrap();
    assert!(joined.is_ok());
    assert!(h
        .transport
        .ops()
        .contains(&TransportOp::Write(handle, b"from foreign thread".to_vec())));
    assert_eq!(h.next_event().await, SinkEvent::Opened(handle));
    assert_eq!(h.next_event().await, SinkEvent::CompletedWrite(handle, 19));
}
