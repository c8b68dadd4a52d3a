//! Bencode encoding and decoding ([BEP-3]).
//!
//! Bencode is the self-describing format used for metadata files and for
//! computing the content fingerprint.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! Decoding threads an explicit cursor through the recursive parse; nothing is
//! shared between calls. Encoding is canonical: dictionary keys are emitted in
//! byte-wise order and byte strings are written back exactly as read.
//!
//! # Examples
//!
//! ```
//! use seedling::bencode::{decode, encode, Value};
//!
//! let data = b"d3:cow3:moo4:spaml1:a1:bee";
//! let value = decode(data).unwrap();
//! assert_eq!(value.get(b"cow").and_then(|v| v.as_str()), Some("moo"));
//! assert_eq!(encode(&value), data);
//! ```
//!
//! # Error Handling
//!
//! Malformed input fails the whole decode call with a [`BencodeError`]:
//!
//! - [`BencodeError::UnexpectedEof`] - a terminator is missing
//! - [`BencodeError::StringTooLong`] - declared length exceeds the input
//! - [`BencodeError::UnexpectedByte`] - unknown leading tag
//! - [`BencodeError::InvalidInteger`] - malformed or non-canonical integer
//! - [`BencodeError::NestingTooDeep`] - recursion limit exceeded (64 levels)
//! - [`BencodeError::TrailingData`] - extra data after the value
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod json;
mod value;

pub use decode::{decode, decode_prefix};
pub use encode::encode;
pub use error::BencodeError;
pub use json::to_json;
pub use value::Value;
