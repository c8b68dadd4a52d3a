//! Peer wire protocol (BEP-3)
//!
//! Covers the 68-byte handshake, length-prefixed framing and a per-peer
//! session that routes frames to registered handlers. No extension bits are
//! set in our handshake, and message semantics beyond framing are left to
//! the handlers.

mod dispatch;
mod error;
mod message;
mod peer_id;
mod session;
mod transport;

pub use dispatch::{Dispatched, Dispatcher, IgnoreUnrecognized, MessageHandler};
pub use error::PeerError;
pub use message::{interested, request, Frame, Handshake, MessageId};
pub use peer_id::PeerId;
pub use session::{PeerSession, SessionState};
pub use transport::PeerTransport;

#[cfg(test)]
mod tests;
