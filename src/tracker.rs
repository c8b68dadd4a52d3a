//! UDP tracker protocol ([BEP-15]).
//!
//! A tracker contact is a two-phase transaction over one UDP socket:
//!
//! 1. **connect** - obtain a short-lived connection id
//! 2. **announce** - send our fingerprint and peer id, receive compact peers
//!
//! Results from several trackers are merged with [`PeerList`], which keeps
//! one entry per `(ip, port)`.
//!
//! [BEP-15]: http://bittorrent.org/beps/bep_0015.html

mod error;
mod response;
mod udp;

pub use error::TrackerError;
pub use response::{parse_compact_peers, AnnounceResponse, PeerAddress, PeerList};
pub use udp::UdpTracker;
