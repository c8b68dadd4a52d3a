//! Protocol constants and default tuning parameters.
//!
//! Wire-level values are fixed by the protocol. Timeouts and limits are only
//! defaults; [`ClientConfig`](crate::config::ClientConfig) can override them.

use std::time::Duration;

// ============================================================================
// Client identification
// ============================================================================

/// Client ID prefix for peer ID generation (Azureus-style)
pub const CLIENT_PREFIX: &[u8; 8] = b"-SD0001-";

/// Default listen port announced to trackers
pub const DEFAULT_PORT: u16 = 6881;

// ============================================================================
// Timeouts
// ============================================================================

/// How long one UDP tracker phase (connect or announce) may wait for a reply
pub const UDP_TRACKER_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP connection timeout for peer sessions
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Time allowed for the peer's handshake reply after ours was sent
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle time allowed between framed messages (peers keep-alive every 2 min)
pub const PEER_READ_TIMEOUT: Duration = Duration::from_secs(180);

/// Write timeout for handshake and outbound frames
pub const PEER_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Buffer sizes
// ============================================================================

/// Initial read buffer capacity for peer connections (32KB)
pub const READ_BUFFER_SIZE: usize = 32768;

/// Maximum accepted frame length (16MB)
pub const MAX_MESSAGE_SIZE: usize = 16777216;

/// Receive buffer for tracker datagrams (largest UDP payload)
pub const UDP_RECV_BUFFER_SIZE: usize = 65536;

// ============================================================================
// Peer wire protocol
// ============================================================================

/// Protocol name carried in the handshake
pub const PROTOCOL_NAME: &[u8; 19] = b"BitTorrent protocol";

/// Handshake length: 1 + 19 + 8 + 20 + 20
pub const HANDSHAKE_LEN: usize = 68;

// ============================================================================
// UDP tracker protocol constants (BEP-15)
// ============================================================================

/// UDP tracker protocol ID (magic number)
pub const UDP_TRACKER_PROTOCOL_ID: u64 = 0x41727101980;

/// UDP tracker connect action
pub const UDP_ACTION_CONNECT: u32 = 0;

/// UDP tracker announce action
pub const UDP_ACTION_ANNOUNCE: u32 = 1;

/// UDP tracker error action
pub const UDP_ACTION_ERROR: u32 = 3;

/// Connect request length
pub const UDP_CONNECT_REQUEST_LEN: usize = 16;

/// Announce request length
pub const UDP_ANNOUNCE_REQUEST_LEN: usize = 98;

/// Fixed header of an announce response, before the peer records
pub const UDP_ANNOUNCE_RESPONSE_HEADER_LEN: usize = 20;

/// One compact IPv4 peer record: 4 bytes address + 2 bytes port
pub const COMPACT_PEER_LEN: usize = 6;
