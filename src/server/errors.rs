//! # Server Errors

use thiserror::Error;

/// Result type for server operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that end a connection or stop the server.
///
/// Command-level failures are not errors here; they are sent to the client
/// as `-ERR` replies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Request bytes that cannot be framed
    #[error("Protocol error: {0}")]
    Malformed(String),

    /// A request exceeded one of the framing limits
    #[error("Request too large: {what} {size} > {limit}")]
    TooLarge {
        what: &'static str,
        size: usize,
        limit: usize,
    },

    /// Listen address did not parse
    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),

    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking store task panicked or was cancelled
    #[error("Store task failed: {0}")]
    TaskFailed(String),
}

impl ProtocolError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ProtocolError::Malformed(msg.into())
    }

    /// Whether the client should get an error reply before disconnecting
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            ProtocolError::Malformed(_) | ProtocolError::TooLarge { .. }
        )
    }
}
