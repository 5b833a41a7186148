//! Workspace placeholder crate.
//!
//! This crate exists to expose feature flags that map to the individual
//! workspace crates (e.g., `core-socket`). Host applications can depend
//! on `socket-bridge` and enable the documented features without needing
//! to wire each crate individually.
