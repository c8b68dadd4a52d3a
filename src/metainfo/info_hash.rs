use super::error::MetainfoError;
use sha1::{Digest, Sha1};
use std::fmt;

/// The 20-byte content fingerprint of a torrent.
///
/// Computed as the SHA-1 digest of the canonical bencode encoding of the
/// metadata's `info` dictionary. Peers compare it bit for bit during the
/// handshake.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Hashes an already-encoded `info` dictionary.
    pub fn from_info_bytes(raw_info: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(raw_info);
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetainfoError> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| MetainfoError::InvalidInfoHashLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, MetainfoError> {
        let bytes = hex::decode(s).map_err(|_| MetainfoError::InvalidInfoHashLength(s.len() / 2))?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 20]> for InfoHash {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
