//! seedling - BitTorrent swarm bootstrap
//!
//! Takes a torrent's metadata and gets as far as talking to peers: it
//! computes the info hash, asks UDP trackers for peers, and performs the
//! peer wire handshake. What happens after the handshake is up to the
//! message handlers registered on each session.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode encoding/decoding
//! - [`metainfo`] - Torrent metadata and info hash
//! - [`tracker`] - BEP-15 UDP tracker protocol
//! - [`peer`] - BEP-3 handshake, message framing and dispatch
//! - [`bootstrap`] - Tracker fan-out and concurrent handshakes
//! - [`config`] - Client configuration

pub mod bencode;
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod metainfo;
pub mod peer;
pub mod tracker;

pub use bencode::{decode, encode, BencodeError, Value};
pub use bootstrap::{Bootstrap, BootstrapError, BootstrapReport};
pub use config::{ClientConfig, ConfigError};
pub use metainfo::{InfoHash, Metainfo, MetainfoError};
pub use peer::{Dispatcher, Frame, Handshake, MessageHandler, PeerError, PeerId, PeerSession};
pub use tracker::{AnnounceResponse, PeerAddress, PeerList, TrackerError, UdpTracker};
