use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace};

use super::error::TrackerError;
use super::response::{parse_compact_peers, AnnounceResponse, PeerAddress, PeerList};
use crate::constants::{
    UDP_ACTION_ANNOUNCE, UDP_ACTION_CONNECT, UDP_ACTION_ERROR, UDP_ANNOUNCE_REQUEST_LEN,
    UDP_ANNOUNCE_RESPONSE_HEADER_LEN, UDP_CONNECT_REQUEST_LEN, UDP_RECV_BUFFER_SIZE,
    UDP_TRACKER_PROTOCOL_ID, UDP_TRACKER_TIMEOUT,
};
use crate::metainfo::InfoHash;

/// A UDP tracker endpoint ([BEP-15]).
///
/// Holds only the resolved address and the per-phase deadline. Every call to
/// [`announce`](UdpTracker::announce) runs a fresh transaction on its own
/// socket: connect, then announce. The connection id obtained in the first
/// phase never outlives that call, and the socket is released on every exit
/// path.
///
/// # Examples
///
/// ```no_run
/// use seedling::tracker::UdpTracker;
/// use seedling::metainfo::InfoHash;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = UdpTracker::resolve("udp://tracker.example.com:6969/announce").await?;
/// let info_hash = InfoHash::from([0u8; 20]);
/// let peers = tracker.announce(&info_hash, &[1u8; 20], 6881, rand::random()).await?;
/// for peer in peers {
///     println!("{}", peer);
/// }
/// # Ok(())
/// # }
/// ```
///
/// [BEP-15]: http://bittorrent.org/beps/bep_0015.html
#[derive(Debug, Clone)]
pub struct UdpTracker {
    addr: SocketAddr,
    timeout: Duration,
    key: Option<u32>,
}

impl UdpTracker {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: UDP_TRACKER_TIMEOUT,
            key: None,
        }
    }

    /// Resolves a `udp://host:port[/path]` URL.
    ///
    /// IPv4 addresses are preferred because announce responses only carry
    /// IPv4 peer records.
    pub async fn resolve(url: &str) -> Result<Self, TrackerError> {
        let (host, port) = parse_udp_url(url)?;

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), port))
            .await?
            .collect();

        let addr = addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| TrackerError::InvalidUrl(url.to_string()))?;

        debug!(%url, %addr, "resolved tracker");
        Ok(Self::new(addr))
    }

    /// Sets the deadline applied to each phase of a transaction.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends a fixed announce key instead of a fresh random one per call.
    pub fn with_key(mut self, key: u32) -> Self {
        self.key = Some(key);
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Announces ourselves and returns the peers the tracker knows about.
    ///
    /// `transaction_id` correlates requests with responses; datagrams that
    /// carry a different id are discarded.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::Timeout`] if either phase gets no reply in time
    /// - [`TrackerError::Io`] on socket failure
    /// - [`TrackerError::InvalidResponse`] / [`TrackerError::Rejected`] for
    ///   malformed or error responses
    pub async fn announce(
        &self,
        info_hash: &InfoHash,
        peer_id: &[u8; 20],
        port: u16,
        transaction_id: u32,
    ) -> Result<Vec<PeerAddress>, TrackerError> {
        let response = self
            .announce_detailed(info_hash, peer_id, port, transaction_id)
            .await?;
        Ok(response.peers)
    }

    /// Like [`announce`](UdpTracker::announce), but also returns the interval
    /// and swarm counters.
    pub async fn announce_detailed(
        &self,
        info_hash: &InfoHash,
        peer_id: &[u8; 20],
        port: u16,
        transaction_id: u32,
    ) -> Result<AnnounceResponse, TrackerError> {
        let transaction = Transaction::open(self.addr, transaction_id, self.timeout).await?;

        let connection_id = transaction.connect().await?;
        let key = self.key.unwrap_or_else(rand::random);
        let response = transaction
            .announce(connection_id, info_hash, peer_id, key, port)
            .await?;

        info!(
            tracker = %self.addr,
            interval = response.interval,
            leechers = response.leechers,
            seeders = response.seeders,
            peers = response.peers.len(),
            "announce complete"
        );

        Ok(response)
    }
}

/// One connect+announce exchange. Dropping it closes the socket.
struct Transaction {
    socket: UdpSocket,
    transaction_id: u32,
    timeout: Duration,
}

impl Transaction {
    async fn open(
        addr: SocketAddr,
        transaction_id: u32,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(addr).await?;

        Ok(Self {
            socket,
            transaction_id,
            timeout,
        })
    }

    async fn connect(&self) -> Result<u64, TrackerError> {
        let request = connect_request(self.transaction_id);
        debug!(transaction_id = self.transaction_id, "sending connect");

        let response = self.exchange(&request, UDP_ACTION_CONNECT).await?;
        parse_connect_response(&response)
    }

    async fn announce(
        &self,
        connection_id: u64,
        info_hash: &InfoHash,
        peer_id: &[u8; 20],
        key: u32,
        port: u16,
    ) -> Result<AnnounceResponse, TrackerError> {
        let request = announce_request(
            connection_id,
            self.transaction_id,
            info_hash,
            peer_id,
            key,
            port,
        );
        debug!(transaction_id = self.transaction_id, "sending announce");

        let response = self.exchange(&request, UDP_ACTION_ANNOUNCE).await?;
        parse_announce_response(&response)
    }

    /// Sends one request and waits for the datagram carrying our
    /// transaction id and either `action` or an error.
    ///
    /// Both phases share one transaction id, so a late duplicate of the
    /// connect reply can arrive while we wait for the announce reply.
    async fn exchange(&self, request: &[u8], action: u32) -> Result<Bytes, TrackerError> {
        let deadline = Instant::now() + self.timeout;
        self.socket.send(request).await?;

        let mut buf = vec![0u8; UDP_RECV_BUFFER_SIZE];
        loop {
            let n = timeout_at(deadline, self.socket.recv(&mut buf))
                .await
                .map_err(|_| TrackerError::Timeout)??;

            if n < 8 {
                return Err(TrackerError::InvalidResponse("response too short".into()));
            }

            let resp_tid = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
            if resp_tid != self.transaction_id {
                trace!(
                    expected = self.transaction_id,
                    got = resp_tid,
                    "discarding datagram for another transaction"
                );
                continue;
            }

            let resp_action = action_of(&buf[..n]);
            if resp_action != action && resp_action != UDP_ACTION_ERROR {
                trace!(
                    expected = action,
                    got = resp_action,
                    "discarding datagram for another phase"
                );
                continue;
            }

            return Ok(Bytes::copy_from_slice(&buf[..n]));
        }
    }
}

pub(crate) fn connect_request(transaction_id: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(UDP_CONNECT_REQUEST_LEN);
    buf.put_u64(UDP_TRACKER_PROTOCOL_ID);
    buf.put_u32(UDP_ACTION_CONNECT);
    buf.put_u32(transaction_id);
    buf.freeze()
}

pub(crate) fn announce_request(
    connection_id: u64,
    transaction_id: u32,
    info_hash: &InfoHash,
    peer_id: &[u8; 20],
    key: u32,
    port: u16,
) -> Bytes {
    let mut buf = BytesMut::with_capacity(UDP_ANNOUNCE_REQUEST_LEN);
    buf.put_u64(connection_id);
    buf.put_u32(UDP_ACTION_ANNOUNCE);
    buf.put_u32(transaction_id);
    buf.put_slice(info_hash.as_bytes());
    buf.put_slice(peer_id);
    buf.put_u64(0); // downloaded
    buf.put_u64(0); // left
    buf.put_u64(0); // uploaded
    buf.put_u32(0); // event: none
    buf.put_u32(0); // IP address (0 = default)
    buf.put_u32(key);
    buf.put_i32(-1); // num_want (-1 = default)
    buf.put_u16(port);
    buf.freeze()
}

/// Returns the connection id from a connect response.
pub(crate) fn parse_connect_response(data: &[u8]) -> Result<u64, TrackerError> {
    let mut data = check_action(data, UDP_ACTION_CONNECT)?;

    if data.remaining() < 8 {
        return Err(TrackerError::InvalidResponse(
            "connect response too short".into(),
        ));
    }

    Ok(data.get_u64())
}

pub(crate) fn parse_announce_response(data: &[u8]) -> Result<AnnounceResponse, TrackerError> {
    let mut data = check_action(data, UDP_ACTION_ANNOUNCE)?;

    if data.remaining() < UDP_ANNOUNCE_RESPONSE_HEADER_LEN - 8 {
        return Err(TrackerError::InvalidResponse(
            "announce response too short".into(),
        ));
    }

    let interval = data.get_u32();
    let leechers = data.get_u32();
    let seeders = data.get_u32();
    // trackers occasionally repeat a record
    let peers = parse_compact_peers(data)
        .into_iter()
        .collect::<PeerList>()
        .into_vec();

    Ok(AnnounceResponse {
        interval,
        leechers,
        seeders,
        peers,
    })
}

/// Validates the action field and returns the bytes after the 8-byte header.
fn check_action(data: &[u8], expected: u32) -> Result<&[u8], TrackerError> {
    if data.len() < 8 {
        return Err(TrackerError::InvalidResponse("response too short".into()));
    }

    match action_of(data) {
        action if action == expected => Ok(&data[8..]),
        UDP_ACTION_ERROR => {
            let message = String::from_utf8_lossy(&data[8..]).to_string();
            Err(TrackerError::Rejected(message))
        }
        action => Err(TrackerError::InvalidResponse(format!(
            "unexpected action {} (expected {})",
            action, expected
        ))),
    }
}

fn action_of(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

pub(crate) fn parse_udp_url(url: &str) -> Result<(String, u16), TrackerError> {
    let rest = match url.strip_prefix("udp://") {
        Some(rest) => rest,
        None => {
            return Err(match url.split_once("://") {
                Some((scheme, _)) => TrackerError::UnsupportedProtocol(scheme.to_string()),
                None => TrackerError::InvalidUrl(url.to_string()),
            })
        }
    };

    let authority = rest.split('/').next().unwrap_or(rest);

    let (host, port) = authority
        .rsplit_once(':')
        .ok_or_else(|| TrackerError::InvalidUrl(url.to_string()))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(TrackerError::InvalidUrl(url.to_string()));
    }

    let port: u16 = port
        .parse()
        .map_err(|_| TrackerError::InvalidUrl(url.to_string()))?;

    Ok((host.to_string(), port))
}
