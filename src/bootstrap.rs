//! Swarm bootstrap: from metadata bytes to established peer sessions.
//!
//! [`Bootstrap::run`] loads the metadata, derives the info hash, asks every
//! UDP tracker in turn for peers, merges the answers into one deduplicated
//! [`PeerList`], and then handshakes with all of those peers concurrently.
//!
//! A tracker or peer that fails is logged and reported in the
//! [`BootstrapReport`]; it never aborts the run.
//!
//! ```no_run
//! use bytes::Bytes;
//! use seedling::bootstrap::{Bootstrap, NullSink};
//! use seedling::config::ClientConfig;
//!
//! # async fn example(torrent: Bytes) -> Result<(), Box<dyn std::error::Error>> {
//! let bootstrap = Bootstrap::new(ClientConfig::default());
//! let report = bootstrap.run(&torrent, &mut NullSink).await?;
//!
//! for session in report.established() {
//!     println!("connected to {}", session.addr());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::bencode::{self, Value};
use crate::config::ClientConfig;
use crate::metainfo::{InfoHash, Metainfo, MetainfoError};
use crate::peer::{PeerError, PeerId, PeerSession};
use crate::tracker::{PeerAddress, PeerList, TrackerError, UdpTracker};

/// Errors that stop a bootstrap run outright.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The metadata source could not produce any bytes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Metainfo(#[from] MetainfoError),

    /// Every tracker failed; there is nobody to connect to.
    #[error("no tracker responded ({0} tried)")]
    NoTrackers(usize),
}

/// Where the metadata bytes come from.
pub trait MetadataSource {
    fn load(&self) -> Result<Bytes, BootstrapError>;
}

impl MetadataSource for Bytes {
    fn load(&self) -> Result<Bytes, BootstrapError> {
        Ok(self.clone())
    }
}

/// Supplies our peer id and the per-request random values.
///
/// `peer_id` must return the same id for the whole run: trackers and peers
/// see it in both the announce and the handshake.
pub trait IdentitySource {
    fn peer_id(&self) -> PeerId;
    fn transaction_id(&self) -> u32;
    fn key(&self) -> u32;
}

/// Random identity: one generated peer id, fresh random transaction ids.
#[derive(Debug, Clone, Copy)]
pub struct RandomIdentity {
    peer_id: PeerId,
    key: u32,
}

impl RandomIdentity {
    pub fn new() -> Self {
        Self {
            peer_id: PeerId::generate(),
            key: rand::random(),
        }
    }
}

impl Default for RandomIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySource for RandomIdentity {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn transaction_id(&self) -> u32 {
        rand::random()
    }

    fn key(&self) -> u32 {
        self.key
    }
}

/// Receives the decoded metadata before any network traffic, e.g. to dump it
/// with [`bencode::to_json`].
pub trait MetadataSink {
    fn inspect(&mut self, metadata: &Value);
}

/// Discards the metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetadataSink for NullSink {
    fn inspect(&mut self, _metadata: &Value) {}
}

/// Result of one tracker contact.
#[derive(Debug)]
pub struct TrackerOutcome {
    pub url: String,
    /// Number of peers this tracker added to the list, or why it failed.
    pub result: Result<usize, TrackerError>,
}

/// Result of one handshake attempt.
#[derive(Debug)]
pub struct PeerOutcome {
    pub peer: PeerAddress,
    pub result: Result<PeerSession, PeerError>,
}

/// Everything a bootstrap run produced.
#[derive(Debug)]
pub struct BootstrapReport {
    pub info_hash: InfoHash,
    pub trackers: Vec<TrackerOutcome>,
    pub peers: PeerList,
    /// One entry per peer, in peer list order.
    pub sessions: Vec<PeerOutcome>,
}

impl BootstrapReport {
    /// Sessions whose handshake succeeded.
    pub fn established(&self) -> impl Iterator<Item = &PeerSession> {
        self.sessions
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
    }

    /// Consumes the report, keeping only the established sessions.
    pub fn into_established(self) -> Vec<PeerSession> {
        self.sessions
            .into_iter()
            .filter_map(|outcome| outcome.result.ok())
            .collect()
    }
}

/// Drives tracker discovery and the initial peer handshakes.
pub struct Bootstrap<I = RandomIdentity> {
    config: ClientConfig,
    identity: I,
}

impl Bootstrap<RandomIdentity> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_identity(config, RandomIdentity::new())
    }
}

impl<I: IdentitySource> Bootstrap<I> {
    pub fn with_identity(config: ClientConfig, identity: I) -> Self {
        Self { config, identity }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs the whole bootstrap.
    ///
    /// # Errors
    ///
    /// Fails only if the metadata cannot be loaded or parsed, or if no
    /// tracker answered at all. Individual tracker and peer failures are
    /// returned inside the report.
    pub async fn run<S, K>(&self, source: &S, sink: &mut K) -> Result<BootstrapReport, BootstrapError>
    where
        S: MetadataSource + ?Sized,
        K: MetadataSink + ?Sized,
    {
        let data = source.load()?;
        let root = bencode::decode(&data).map_err(MetainfoError::from)?;
        sink.inspect(&root);

        let metainfo = Metainfo::from_value(&root)?;
        info!(
            info_hash = %metainfo.info_hash,
            name = ?metainfo.name,
            trackers = metainfo.trackers().len(),
            "loaded metadata"
        );

        let (peers, trackers) = self.discover(&metainfo).await;
        if !trackers.is_empty() && trackers.iter().all(|t| t.result.is_err()) {
            return Err(BootstrapError::NoTrackers(trackers.len()));
        }

        let sessions = self.connect_all(metainfo.info_hash, &peers).await;

        Ok(BootstrapReport {
            info_hash: metainfo.info_hash,
            trackers,
            peers,
            sessions,
        })
    }

    /// Contacts each tracker in turn and merges their peers.
    ///
    /// Trackers are tried one after another with no retry. A failing tracker
    /// is logged and skipped.
    pub async fn discover(&self, metainfo: &Metainfo) -> (PeerList, Vec<TrackerOutcome>) {
        let mut peers = PeerList::new();
        let mut outcomes = Vec::new();

        for url in metainfo.trackers() {
            let result = match self.announce(&url, &metainfo.info_hash).await {
                Ok(found) => {
                    let total = found.len();
                    let added = peers.extend(found);
                    debug!(tracker = %url, total, added, "tracker answered");
                    Ok(added)
                }
                Err(e) => {
                    warn!(tracker = %url, error = %e, "tracker failed");
                    Err(e)
                }
            };
            outcomes.push(TrackerOutcome { url, result });
        }

        info!(peers = peers.len(), "peer discovery finished");
        (peers, outcomes)
    }

    async fn announce(
        &self,
        url: &str,
        info_hash: &InfoHash,
    ) -> Result<Vec<PeerAddress>, TrackerError> {
        let tracker = UdpTracker::resolve(url)
            .await?
            .with_timeout(self.config.tracker_timeout())
            .with_key(self.identity.key());

        tracker
            .announce(
                info_hash,
                self.identity.peer_id().as_bytes(),
                self.config.listen_port,
                self.identity.transaction_id(),
            )
            .await
    }

    /// Handshakes with every peer at once, one task per peer.
    ///
    /// Results come back in peer list order.
    pub async fn connect_all(&self, info_hash: InfoHash, peers: &PeerList) -> Vec<PeerOutcome> {
        let peer_id = self.identity.peer_id();
        let config = self.config.clone();

        let outcomes = handshake_each(peers, move |peer| {
            let config = config.clone();
            async move {
                PeerSession::connect(peer.to_socket_addr(), info_hash, peer_id, &config).await
            }
        })
        .await;

        let established = outcomes.iter().filter(|o| o.result.is_ok()).count();
        info!(peers = peers.len(), established, "handshakes finished");
        outcomes
    }
}

/// Runs `connect` for every peer on its own task and lines the results up
/// with the peer list. A task that panics yields a `TaskFailed` outcome.
async fn handshake_each<F, Fut>(peers: &PeerList, connect: F) -> Vec<PeerOutcome>
where
    F: Fn(PeerAddress) -> Fut,
    Fut: Future<Output = Result<PeerSession, PeerError>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    let mut positions = HashMap::with_capacity(peers.len());

    for (index, &peer) in peers.iter().enumerate() {
        let handle = tasks.spawn(connect(peer));
        positions.insert(handle.id(), index);
    }

    let mut results: Vec<Option<Result<PeerSession, PeerError>>> =
        peers.iter().map(|_| None).collect();

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(e) => {
                warn!(error = %e, "handshake task failed");
                (e.id(), Err(PeerError::TaskFailed(e.to_string())))
            }
        };

        if let Some(&index) = positions.get(&id) {
            results[index] = Some(result);
        }
    }

    peers
        .iter()
        .zip(results)
        .map(|(&peer, result)| PeerOutcome {
            peer,
            result: result
                .unwrap_or_else(|| Err(PeerError::TaskFailed("no result".to_string()))),
        })
        .collect()
}
