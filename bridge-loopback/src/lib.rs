//! In-process loopback transport.
//!
//! # Overview
//!
//! [`LoopbackTransport`] implements the transport capability entirely in
//! memory: opens are marshalled through the wire codec exactly as an
//! out-of-process adapter would, and every written frame is echoed back
//! as a received frame. It exists for integration testing and as the
//! reference for writing real adapters; the event sequences it produces
//! are the ones a production transport is expected to produce.

pub mod transport;

pub use transport::LoopbackTransport;
