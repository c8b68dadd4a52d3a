use thiserror::Error;

/// Errors from a single UDP tracker transaction.
///
/// None of these are retried inside the transaction. Callers decide whether
/// to move on to another tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Socket-level failure (bind, send, receive or name resolution).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The tracker answered with an error action.
    #[error("tracker returned error: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No reply arrived before the deadline.
    #[error("timeout")]
    Timeout,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),
}
