use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, BencodeError, Value};
use bytes::Bytes;

/// A parsed metadata file.
///
/// Only the parts the bootstrap stack needs are interpreted: the tracker
/// endpoints and the `info` dictionary. The `info` dictionary is kept as a
/// raw [`Value`] together with its canonical encoding, from which the
/// fingerprint is derived.
///
/// # Examples
///
/// ```
/// use seedling::metainfo::Metainfo;
///
/// let data = b"d8:announce21:udp://tracker.test:804:infod4:name4:testee";
/// let metainfo = Metainfo::from_bytes(data).unwrap();
///
/// assert_eq!(metainfo.trackers(), vec!["udp://tracker.test:80".to_string()]);
/// assert_eq!(metainfo.name.as_deref(), Some("test"));
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// The `info` dictionary, exactly as decoded.
    pub info: Value,
    /// The content fingerprint (SHA-1 of the canonical `info` encoding).
    pub info_hash: InfoHash,
    /// Primary tracker URL.
    pub announce: Option<String>,
    /// Tiered tracker list ([BEP-12](http://bittorrent.org/beps/bep_0012.html)).
    pub announce_list: Vec<Vec<String>>,
    /// Suggested name from `info.name`, when present and valid UTF-8.
    pub name: Option<String>,
    raw_info: Bytes,
}

impl Metainfo {
    /// Parses a metadata file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The data is not valid bencode
    /// - The root or `info` is not a dictionary
    /// - Neither `announce` nor `announce-list` is present
    /// - A tracker field has the wrong type or is not UTF-8
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let root = decode(data)?;
        Self::from_value(&root)
    }

    /// Interprets an already-decoded metadata value.
    pub fn from_value(root: &Value) -> Result<Self, MetainfoError> {
        let dict = root.as_dict().ok_or(MetainfoError::InvalidField("root"))?;

        let info = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;

        if info.as_dict().is_none() {
            return Err(MetainfoError::InvalidField("info"));
        }

        let raw_info = Bytes::from(encode(info));
        let info_hash = InfoHash::from_info_bytes(&raw_info);

        let announce = dict
            .get(b"announce".as_slice())
            .map(|v| v.expect_str().map(String::from))
            .transpose()
            .map_err(|_| MetainfoError::InvalidField("announce"))?;

        let announce_list = match dict.get(b"announce-list".as_slice()) {
            Some(value) => parse_announce_list(value)?,
            None => Vec::new(),
        };

        if announce.is_none() && announce_list.iter().all(Vec::is_empty) {
            return Err(MetainfoError::MissingField("announce"));
        }

        let name = info.get(b"name").and_then(|v| v.as_str()).map(String::from);

        Ok(Self {
            info: info.clone(),
            info_hash,
            announce,
            announce_list,
            name,
            raw_info,
        })
    }

    /// Returns the canonical bencoded `info` dictionary.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }

    /// Returns all tracker URLs from both `announce` and `announce-list`.
    ///
    /// The primary tracker comes first, followed by the tiers in order.
    /// Duplicates are removed.
    pub fn trackers(&self) -> Vec<String> {
        let mut trackers = Vec::new();

        if let Some(ref announce) = self.announce {
            trackers.push(announce.clone());
        }

        for tier in &self.announce_list {
            for tracker in tier {
                if !trackers.contains(tracker) {
                    trackers.push(tracker.clone());
                }
            }
        }

        trackers
    }
}

fn parse_announce_list(value: &Value) -> Result<Vec<Vec<String>>, MetainfoError> {
    let invalid = |_: BencodeError| MetainfoError::InvalidField("announce-list");

    value
        .expect_list()
        .map_err(invalid)?
        .iter()
        .map(|tier| -> Result<Vec<String>, MetainfoError> {
            tier.expect_list()
                .map_err(invalid)?
                .iter()
                .map(|url| url.expect_str().map(String::from).map_err(invalid))
                .collect()
        })
        .collect()
}
