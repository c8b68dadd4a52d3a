use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors that can occur when interpreting a metadata file.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The metadata is not valid bencode, or a field has the wrong type.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    /// A required field is missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field has an invalid value or type.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// A fingerprint was built from the wrong number of bytes.
    #[error("invalid info hash length: {0}")]
    InvalidInfoHashLength(usize),
}
