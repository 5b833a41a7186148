use thiserror::Error;

/// Errors surfaced by the bridge core itself.
///
/// Deliberately small: per-connection trouble (unknown handles, calls
/// arriving in a state that does not admit them, transport refusals) is
/// logged and dropped rather than returned, because by the time the
/// caller could react the connection is already gone. What remains are
/// assembly-time failures and execution-context failures.
#[derive(Error, Debug)]
pub enum SocketError {
    /// A required capability was not registered at startup. Fatal: no
    /// connection can ever succeed without it.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// No runtime context could be bound for a cross-boundary call.
    /// Fatal for that call only.
    #[error("no execution context available: {0}")]
    ContextUnavailable(String),
}

pub type Result<T> = std::result::Result<T, SocketError>;
