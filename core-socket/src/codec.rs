//! Binary codec for marshalling the connection target and opaque blobs
//! across a runtime boundary.
//!
//! Wire format of an open envelope:
//! ```text
//! [version:1][scheme][hostname][port:2][path][options_len:4][options:N]
//! ```
//! where strings are 2-byte length-prefixed UTF-8. Header lists are
//! `[version:1][count:2]` followed by length-prefixed key/value string
//! pairs. All multi-byte integers are big-endian.
//!
//! In-process transports pass [`SocketAddress`] values directly; this
//! codec exists for adapters whose far side lives in another process or
//! runtime and only ever sees bytes.

use bridge_traits::{OptionsBlob, SocketAddress};
use thiserror::Error;

/// Codec wire version. Bumped when the envelope layout changes.
pub const CODEC_VERSION: u8 = 1;

/// Errors that can occur while decoding a marshalled payload.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// The byte slice is shorter than the structure it claims to hold.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The version byte is not a layout this build understands.
    #[error("unsupported codec version: {0}")]
    UnsupportedVersion(u8),

    /// A field could not be parsed (invalid UTF-8, bad length, empty
    /// required field, trailing bytes).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A field exceeds what its length prefix can carry. Raised at
    /// encode time; nothing is ever silently truncated onto the wire.
    #[error("field too long: {field} is {actual} bytes, max {max}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

/// The decoded contents of an open call: where to connect and the
/// transport-private options blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEnvelope {
    pub address: SocketAddress,
    pub options: OptionsBlob,
}

/// Encodes an open envelope for transfer across the boundary. Fields
/// that do not fit their length prefix are rejected, never truncated.
pub fn encode_open(address: &SocketAddress, options: &OptionsBlob) -> Result<Vec<u8>, CodecError> {
    let options_len = u32::try_from(options.len()).map_err(|_| CodecError::FieldTooLong {
        field: "options",
        max: u32::MAX as usize,
        actual: options.len(),
    })?;
    let mut buf = Vec::with_capacity(
        1 + 2
            + address.scheme.len()
            + 2
            + address.hostname.len()
            + 2
            + 2
            + address.path.len()
            + 4
            + options.len(),
    );
    buf.push(CODEC_VERSION);
    write_string(&mut buf, "scheme", &address.scheme)?;
    write_string(&mut buf, "hostname", &address.hostname)?;
    buf.extend_from_slice(&address.port.to_be_bytes());
    write_string(&mut buf, "path", &address.path)?;
    buf.extend_from_slice(&options_len.to_be_bytes());
    buf.extend_from_slice(options.as_slice());
    Ok(buf)
}

/// Decodes an [`OpenEnvelope`] produced by [`encode_open`].
pub fn decode_open(bytes: &[u8]) -> Result<OpenEnvelope, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let version = cursor.read_u8()?;
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let scheme = cursor.read_string()?;
    let hostname = cursor.read_string()?;
    let port = cursor.read_u16()?;
    let path = cursor.read_string()?;
    let options_len = cursor.read_u32()? as usize;
    let options = cursor.read_bytes(options_len)?.to_vec();
    cursor.finish()?;

    let address = SocketAddress::new(scheme, hostname, port, path)
        .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
    Ok(OpenEnvelope {
        address,
        options: OptionsBlob::new(options),
    })
}

/// Encodes an HTTP header list as an opaque blob for
/// `got_http_response`. Oversize lists and fields are rejected, never
/// truncated.
pub fn encode_headers(headers: &[(String, String)]) -> Result<OptionsBlob, CodecError> {
    let count = u16::try_from(headers.len()).map_err(|_| CodecError::FieldTooLong {
        field: "header count",
        max: u16::MAX as usize,
        actual: headers.len(),
    })?;
    let mut buf = Vec::new();
    buf.push(CODEC_VERSION);
    buf.extend_from_slice(&count.to_be_bytes());
    for (name, value) in headers {
        write_string(&mut buf, "header name", name)?;
        write_string(&mut buf, "header value", value)?;
    }
    Ok(OptionsBlob::new(buf))
}

/// Decodes a header blob produced by [`encode_headers`].
pub fn decode_headers(blob: &OptionsBlob) -> Result<Vec<(String, String)>, CodecError> {
    let mut cursor = Cursor::new(blob.as_slice());
    let version = cursor.read_u8()?;
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let count = cursor.read_u16()? as usize;
    let mut headers = Vec::with_capacity(count);
    for _ in 0..count {
        let name = cursor.read_string()?;
        let value = cursor.read_string()?;
        headers.push((name, value));
    }
    cursor.finish()?;
    Ok(headers)
}

/// Writes a 2-byte length prefix followed by the UTF-8 string bytes.
fn write_string(buf: &mut Vec<u8>, field: &'static str, s: &str) -> Result<(), CodecError> {
    let bytes = s.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| CodecError::FieldTooLong {
        field,
        max: u16::MAX as usize,
        actual: bytes.len(),
    })?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.offset.checked_add(len).ok_or_else(|| {
            CodecError::MalformedPayload(format!("length overflow at offset {}", self.offset))
        })?;
        if self.bytes.len() < end {
            return Err(CodecError::InsufficientData {
                needed: end,
                available: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| CodecError::MalformedPayload(format!("invalid UTF-8: {e}")))
    }

    /// The whole payload must be consumed; leftovers mean a corrupted
    /// or mismatched envelope.
    fn finish(self) -> Result<(), CodecError> {
        let remaining = self.bytes.len() - self.offset;
        if remaining != 0 {
            return Err(CodecError::MalformedPayload(format!(
                "{remaining} trailing bytes after payload"
            )));
        }
        Ok(())
    }
}
