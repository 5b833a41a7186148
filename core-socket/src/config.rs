//! Bridge configuration.
//!
//! # Overview
//!
//! The bridge is assembled by dependency injection: the host supplies a
//! transport, an event sink, and optionally a factory context and
//! framing mode, and the builder validates the assembly before anything
//! runs. A missing capability fails here, at startup, with an error that
//! names what to register; it never surfaces later as a per-connection
//! failure.
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = BridgeConfig::builder()
//!     .with_transport(Arc::new(my_transport))
//!     .with_event_sink(Arc::new(my_sink))
//!     .with_framing(FramingMode::WebSocketClient)
//!     .build()?;
//! let bridge = SocketBridge::new(config)?;
//! ```

use crate::error::{Result, SocketError};
use bridge_traits::{FactoryContext, FramingMode, SocketEventSink, SocketTransport};
use std::fmt;
use std::sync::Arc;

/// Default bound of the per-connection event queue. Deep enough to
/// absorb delivery bursts, small enough to exert backpressure on a
/// transport outrunning its consumer.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

/// Validated bridge assembly. Construct via [`BridgeConfig::builder`].
#[derive(Clone)]
pub struct BridgeConfig {
    pub(crate) transport: Arc<dyn SocketTransport>,
    pub(crate) event_sink: Arc<dyn SocketEventSink>,
    pub(crate) framing: FramingMode,
    pub(crate) factory_context: FactoryContext,
    pub(crate) event_queue_capacity: usize,
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::new()
    }

    pub fn framing(&self) -> FramingMode {
        self.framing
    }

    pub fn event_queue_capacity(&self) -> usize {
        self.event_queue_capacity
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("framing", &self.framing)
            .field("event_queue_capacity", &self.event_queue_capacity)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BridgeConfig`].
pub struct BridgeConfigBuilder {
    transport: Option<Arc<dyn SocketTransport>>,
    event_sink: Option<Arc<dyn SocketEventSink>>,
    framing: FramingMode,
    factory_context: Option<FactoryContext>,
    event_queue_capacity: usize,
}

impl Default for BridgeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeConfigBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            event_sink: None,
            framing: FramingMode::default(),
            factory_context: None,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }

    /// Registers the transport that carries operations to the far side.
    /// Required.
    pub fn with_transport(mut self, transport: Arc<dyn SocketTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Registers the consumer sink that receives ordered upward events.
    /// Required.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn SocketEventSink>) -> Self {
        self.event_sink = Some(event_sink);
        self
    }

    /// Sets who performs message framing. Recorded per connection and
    /// passed through untouched; the bridge itself never frames.
    pub fn with_framing(mut self, framing: FramingMode) -> Self {
        self.framing = framing;
        self
    }

    /// Opaque host object handed back to the transport on every call.
    /// Defaults to a unit value when the transport needs nothing.
    pub fn with_factory_context(mut self, context: FactoryContext) -> Self {
        self.factory_context = Some(context);
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    /// Validates the assembly. Missing capabilities are fatal here.
    pub fn build(self) -> Result<BridgeConfig> {
        let transport = self
            .transport
            .ok_or_else(|| SocketError::CapabilityMissing {
                capability: "SocketTransport".to_string(),
                message: "register a transport with with_transport() before building".to_string(),
            })?;
        let event_sink = self
            .event_sink
            .ok_or_else(|| SocketError::CapabilityMissing {
                capability: "SocketEventSink".to_string(),
                message: "register an event sink with with_event_sink() before building"
                    .to_string(),
            })?;
        if self.event_queue_capacity == 0 {
            return Err(SocketError::Config(
                "event queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(BridgeConfig {
            transport,
            event_sink,
            framing: self.framing,
            factory_context: self.factory_context.unwrap_or_else(|| Arc::new(())),
            event_queue_capacity: self.event_queue_capacity,
        })
    }
}
