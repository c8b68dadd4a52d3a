//! Metadata file handling ([BEP-3]).
//!
//! A metadata file is a bencoded dictionary holding at least:
//!
//! - **announce** - primary tracker URL
//! - **announce-list** - tiers of additional tracker URLs ([BEP-12])
//! - **info** - content description; its canonical encoding is hashed with
//!   SHA-1 to produce the [`InfoHash`] fingerprint
//!
//! # Examples
//!
//! ```
//! use seedling::metainfo::{InfoHash, Metainfo};
//!
//! let data = b"d8:announce21:udp://tracker.test:804:infod4:name4:testee";
//! let metainfo = Metainfo::from_bytes(data).unwrap();
//!
//! // The fingerprint only depends on the canonical info encoding.
//! assert_eq!(metainfo.info_hash, InfoHash::from_info_bytes(b"d4:name4:teste"));
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [BEP-12]: http://bittorrent.org/beps/bep_0012.html

mod error;
mod info_hash;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::Metainfo;
