use std::fmt;

use rand::Rng as _;

use crate::constants::CLIENT_PREFIX;

/// Our 20-byte identity in the swarm.
///
/// Generated IDs use the Azureus-style layout `-SD0001-<12 random bytes>`.
/// The same value is sent to trackers and in every handshake.
///
/// ```
/// use seedling::peer::PeerId;
///
/// let peer_id = PeerId::generate();
/// assert_eq!(peer_id.client_id(), Some("SD0001"));
/// assert_ne!(peer_id, PeerId::generate());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl PeerId {
    pub fn generate() -> Self {
        let mut id = [0u8; 20];
        id[..8].copy_from_slice(CLIENT_PREFIX);
        rand::rng().fill(&mut id[8..]);
        Self(id)
    }

    /// Returns `None` unless the slice is exactly 20 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Returns the raw 20-byte peer ID.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The 6-character client tag of an Azureus-style id (`-XXXXXX-`).
    pub fn client_id(&self) -> Option<&str> {
        if self.0[0] == b'-' && self.0[7] == b'-' {
            std::str::from_utf8(&self.0[1..7]).ok()
        } else {
            None
        }
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(client) = self.client_id() {
            write!(f, "PeerId({})", client)
        } else {
            write!(f, "PeerId({:02x?})", &self.0[..8])
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            if byte.is_ascii_alphanumeric() || *byte == b'-' {
                write!(f, "{}", *byte as char)?;
            } else {
                write!(f, "%{:02x}", byte)?;
            }
        }
        Ok(())
    }
}
