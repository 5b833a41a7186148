//! Shared data types crossing the bridge boundary.

use crate::error::{BridgeError, Result};
use bytes::Bytes;
use std::fmt;

/// Opaque identifier for one logical connection, shared by both sides of
/// the bridge.
///
/// Handles are allocated by the bridge core from a monotonically
/// increasing counter and are never reused within the lifetime of a
/// bridge instance. Neither side owns the memory behind a handle; each
/// side only holds an interest bracket (`open`..`dispose` downward,
/// `open`..`closed` upward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(u64);

impl SocketHandle {
    /// Reconstructs a handle from its raw value, e.g. one that crossed a
    /// foreign-runtime boundary as an integer.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value, suitable for marshalling across a boundary.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// Connection target: scheme, hostname, port and path.
///
/// Immutable once a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketAddress {
    pub scheme: String,
    pub hostname: String,
    pub port: u16,
    pub path: String,
}

impl SocketAddress {
    /// Builds a validated address. The scheme and hostname must be
    /// non-empty; the port range is enforced by the type.
    pub fn new(
        scheme: impl Into<String>,
        hostname: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Result<Self> {
        let scheme = scheme.into();
        let hostname = hostname.into();
        if scheme.is_empty() {
            return Err(BridgeError::InvalidAddress("scheme must not be empty".into()));
        }
        if hostname.is_empty() {
            return Err(BridgeError::InvalidAddress(
                "hostname must not be empty".into(),
            ));
        }
        Ok(Self {
            scheme,
            hostname,
            port,
            path: path.into(),
        })
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}{}",
            self.scheme, self.hostname, self.port, self.path
        )
    }
}

/// Opaque binary payload passed across the boundary.
///
/// Used for the options blob handed to the transport at open time and
/// for the encoded response headers of `got_http_response`. The bridge
/// never interprets the contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsBlob(Vec<u8>);

impl OptionsBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for OptionsBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for OptionsBlob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// One immutable unit of bytes exchanged in either direction.
///
/// Ownership transfers to the receiver on delivery; the sender must not
/// mutate it afterwards. Backed by [`Bytes`], so clones are cheap and
/// the immutability guarantee holds structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<Bytes> for Frame {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// Error domain of a [`CloseDescriptor`].
///
/// Distinguishes network-layer, transport-layer (WebSocket status codes)
/// and POSIX-style errors so the consumer can apply domain-specific
/// recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    /// Network-layer errors (DNS, connect, TLS).
    Network,
    /// WebSocket close status codes (1000-4999).
    WebSocket,
    /// POSIX errno values.
    Posix,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorDomain::Network => "network",
            ErrorDomain::WebSocket => "websocket",
            ErrorDomain::Posix => "posix",
        };
        f.write_str(name)
    }
}

/// Why a connection ended: domain, code and message.
///
/// Used both for locally-initiated `close` and for the terminal `closed`
/// event. A zero code means a normal, expected shutdown regardless of
/// domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDescriptor {
    pub domain: ErrorDomain,
    pub code: i32,
    pub message: String,
}

impl CloseDescriptor {
    pub fn new(domain: ErrorDomain, code: i32, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
        }
    }

    /// A normal shutdown: `{Network, 0, ""}`.
    pub fn normal() -> Self {
        Self::new(ErrorDomain::Network, 0, "")
    }

    pub fn is_normal(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for CloseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}/{}", self.domain, self.code)
        } else {
            write!(f, "{}/{}: {}", self.domain, self.code, self.message)
        }
    }
}

/// Framing applied by the transport ahead of the [`Frame`] boundary.
///
/// Configuration only: the bridge passes the mode through to the
/// transport untouched and attaches no protocol behavior to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingMode {
    /// The transport delivers a pre-framed byte stream; the bridge sees
    /// one `Frame` per delivery as-is.
    #[default]
    NoFraming,
    /// The transport applies built-in client-side WebSocket framing.
    WebSocketClient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        let addr = SocketAddress::new("wss", "example.com", 443, "/sync").unwrap();
        assert_eq!(addr.to_string(), "wss://example.com:443/sync");
    }

    #[test]
    fn test_address_rejects_empty_scheme() {
        let err = SocketAddress::new("", "example.com", 443, "/").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidAddress(_)));
    }

    #[test]
    fn test_address_rejects_empty_hostname() {
        let err = SocketAddress::new("wss", "", 443, "/").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidAddress(_)));
    }

    #[test]
    fn test_close_descriptor_normal() {
        assert!(CloseDescriptor::normal().is_normal());
        let abnormal = CloseDescriptor::new(ErrorDomain::WebSocket, 1006, "abnormal closure");
        assert!(!abnormal.is_normal());
        assert_eq!(abnormal.to_string(), "websocket/1006: abnormal closure");
    }

    #[test]
    fn test_frame_clone_shares_contents() {
        let frame = Frame::from(vec![1u8, 2, 3]);
        let clone = frame.clone();
        assert_eq!(frame.as_slice(), clone.as_slice());
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn test_handle_raw_round_trip() {
        let handle = SocketHandle::from_raw(42);
        assert_eq!(handle.as_raw(), 42);
        assert_eq!(handle.to_string(), "socket#42");
    }
}
