use thiserror::Error;

/// Errors that can occur during a peer session.
///
/// Any of these ends the session it came from; other sessions are
/// unaffected.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer's handshake was malformed or named another torrent.
    #[error("invalid handshake: {0} mismatch")]
    InvalidHandshake(&'static str),

    /// Received a malformed or oversized frame.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A message id outside the standard set.
    #[error("unknown message id: {0}")]
    UnknownMessageId(u8),

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// The session is not in the `Established` state.
    #[error("session not established")]
    NotEstablished,

    /// The task driving this session panicked or was cancelled.
    #[error("session task failed: {0}")]
    TaskFailed(String),

    /// Operation timed out.
    #[error("timeout")]
    Timeout,
}
