use super::dispatch::Dispatcher;
use super::error::PeerError;
use super::message::{Frame, Handshake};
use super::peer_id::PeerId;
use super::transport::PeerTransport;
use crate::config::ClientConfig;
use crate::metainfo::InfoHash;
use std::fmt;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Where a session is in its lifecycle.
///
/// `Connecting → HandshakeSent → Established`, or `Closed` from any state.
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// TCP connection in progress.
    Connecting,
    /// Our handshake is on the wire; waiting for the peer's.
    HandshakeSent,
    /// Handshake accepted; framed messages flow.
    Established,
    /// Transport released.
    Closed,
}

/// One connection to one peer.
///
/// The session owns its transport. Any error moves it to
/// [`SessionState::Closed`] and drops the transport; [`close`](Self::close)
/// does the same on request. Either way the teardown happens once.
///
/// # Examples
///
/// ```no_run
/// use seedling::config::ClientConfig;
/// use seedling::metainfo::InfoHash;
/// use seedling::peer::{Dispatcher, PeerId, PeerSession};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let addr = "192.168.1.100:6881".parse()?;
/// let info_hash = InfoHash::from([0u8; 20]);
/// let config = ClientConfig::default();
///
/// let mut session = PeerSession::connect(addr, info_hash, PeerId::generate(), &config).await?;
/// session.run(&mut Dispatcher::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct PeerSession {
    addr: SocketAddr,
    info_hash: InfoHash,
    state: SessionState,
    remote_id: Option<PeerId>,
    config: ClientConfig,
    transport: Option<PeerTransport>,
}

impl PeerSession {
    /// Creates a session in the `Connecting` state without touching the network.
    pub fn new(addr: SocketAddr, info_hash: InfoHash, config: &ClientConfig) -> Self {
        Self {
            addr,
            info_hash,
            state: SessionState::Connecting,
            remote_id: None,
            config: config.clone(),
            transport: None,
        }
    }

    /// Connects and completes the handshake in one step.
    pub async fn connect(
        addr: SocketAddr,
        info_hash: InfoHash,
        our_peer_id: PeerId,
        config: &ClientConfig,
    ) -> Result<Self, PeerError> {
        let mut session = Self::new(addr, info_hash, config);
        session.open(our_peer_id).await?;
        Ok(session)
    }

    /// Opens the TCP connection, sends our handshake and validates the reply.
    ///
    /// On success the session is `Established`; on any failure it is `Closed`.
    pub async fn open(&mut self, our_peer_id: PeerId) -> Result<(), PeerError> {
        if self.state != SessionState::Connecting {
            return Err(PeerError::InvalidMessage(format!(
                "cannot open session in state {:?}",
                self.state
            )));
        }

        let result = self.handshake(our_peer_id).await;
        if let Err(ref e) = result {
            warn!(peer = %self.addr, error = %e, "handshake failed");
            self.close();
        }
        result
    }

    async fn handshake(&mut self, our_peer_id: PeerId) -> Result<(), PeerError> {
        let stream = timeout(self.config.connect_timeout(), TcpStream::connect(self.addr))
            .await
            .map_err(|_| PeerError::Timeout)??;
        let transport = self
            .transport
            .insert(PeerTransport::new(stream, &self.config));

        let handshake = Handshake::new(&self.info_hash, *our_peer_id.as_bytes());
        transport.send_handshake(&handshake).await?;
        self.state = SessionState::HandshakeSent;
        debug!(peer = %self.addr, "handshake sent");

        let reply = transport.receive_handshake().await?;
        let theirs = Handshake::validate(&reply, &self.info_hash)?;

        self.remote_id = Some(PeerId(theirs.peer_id));
        self.state = SessionState::Established;
        info!(peer = %self.addr, remote_id = ?self.remote_id, "session established");
        Ok(())
    }

    /// Waits for the next framed message.
    ///
    /// Any error, including the peer closing the stream, closes the session.
    pub async fn next_frame(&mut self) -> Result<Frame, PeerError> {
        let transport = self.established_transport()?;

        match transport.receive_frame().await {
            Ok(frame) => Ok(frame),
            Err(e) => {
                debug!(peer = %self.addr, error = %e, "receive failed");
                self.close();
                Err(e)
            }
        }
    }

    /// Reads frames and hands them to `dispatcher` until the session ends.
    ///
    /// Returns `Ok(())` when the peer closes the connection, or the first
    /// transport, framing or handler error otherwise.
    pub async fn run(&mut self, dispatcher: &mut Dispatcher) -> Result<(), PeerError> {
        loop {
            let frame = match self.next_frame().await {
                Ok(frame) => frame,
                Err(PeerError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            };

            if let Err(e) = dispatcher.dispatch(self.addr, &frame) {
                self.close();
                return Err(e);
            }
        }
    }

    /// Writes an already-encoded frame, such as one built by
    /// [`interested`](super::interested) or [`request`](super::request).
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), PeerError> {
        let transport = self.established_transport()?;

        if let Err(e) = transport.send_raw(frame).await {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    /// Closes the session. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }

        self.transport = None;
        self.state = SessionState::Closed;
        debug!(peer = %self.addr, "session closed");
        true
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn info_hash(&self) -> &InfoHash {
        &self.info_hash
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The peer id from the remote handshake, once established.
    pub fn remote_id(&self) -> Option<PeerId> {
        self.remote_id
    }

    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }

    fn established_transport(&mut self) -> Result<&mut PeerTransport, PeerError> {
        match (self.state, self.transport.as_mut()) {
            (SessionState::Established, Some(transport)) => Ok(transport),
            _ => Err(PeerError::NotEstablished),
        }
    }
}

impl fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerSession")
            .field("addr", &self.addr)
            .field("info_hash", &self.info_hash)
            .field("state", &self.state)
            .field("remote_id", &self.remote_id)
            .finish()
    }
}
