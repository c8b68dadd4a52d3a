use std::collections::HashSet;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::constants::COMPACT_PEER_LEN;

/// A peer address returned by a tracker.
///
/// Two addresses are the same peer when both the IP and the port match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Parses a peer from compact IPv4 format (6 bytes).
    ///
    /// Format: 4 bytes IP + 2 bytes port (big-endian).
    pub fn from_compact(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < COMPACT_PEER_LEN {
            return None;
        }
        let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_be_bytes([bytes[4], bytes[5]]);
        Some(Self { ip, port })
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl From<SocketAddrV4> for PeerAddress {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

/// Decodes every complete 6-byte record in `data`; a partial record at the
/// end is ignored.
pub fn parse_compact_peers(data: &[u8]) -> Vec<PeerAddress> {
    data.chunks_exact(COMPACT_PEER_LEN)
        .filter_map(PeerAddress::from_compact)
        .collect()
}

/// The result of a successful announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceResponse {
    /// Seconds the tracker asks us to wait before re-announcing.
    pub interval: u32,
    pub leechers: u32,
    pub seeders: u32,
    pub peers: Vec<PeerAddress>,
}

/// An insertion-ordered set of peers merged from several trackers.
///
/// # Examples
///
/// ```
/// use seedling::tracker::{PeerAddress, PeerList};
/// use std::net::Ipv4Addr;
///
/// let mut peers = PeerList::new();
/// peers.extend([PeerAddress::new(Ipv4Addr::new(1, 2, 3, 4), 1)]);
/// let added = peers.extend([
///     PeerAddress::new(Ipv4Addr::new(1, 2, 3, 4), 1),
///     PeerAddress::new(Ipv4Addr::new(5, 6, 7, 8), 2),
/// ]);
/// assert_eq!(added, 1);
/// assert_eq!(peers.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PeerList {
    peers: Vec<PeerAddress>,
    seen: HashSet<PeerAddress>,
}

impl PeerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer unless an equal `(ip, port)` is already present.
    ///
    /// Returns `true` if the peer was new.
    pub fn insert(&mut self, peer: PeerAddress) -> bool {
        if self.seen.insert(peer) {
            self.peers.push(peer);
            true
        } else {
            false
        }
    }

    /// Merges peers, returning how many were new.
    pub fn extend<I: IntoIterator<Item = PeerAddress>>(&mut self, peers: I) -> usize {
        peers.into_iter().filter(|p| self.insert(*p)).count()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerAddress> {
        self.peers.iter()
    }

    pub fn as_slice(&self) -> &[PeerAddress] {
        &self.peers
    }

    pub fn into_vec(self) -> Vec<PeerAddress> {
        self.peers
    }
}

impl FromIterator<PeerAddress> for PeerList {
    fn from_iter<I: IntoIterator<Item = PeerAddress>>(iter: I) -> Self {
        let mut list = PeerList::new();
        list.extend(iter);
        list
    }
}
