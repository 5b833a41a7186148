use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transport not available: {0}")]
    NotAvailable(String),

    #[error("transport operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
