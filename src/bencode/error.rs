use thiserror::Error;

/// Errors produced while decoding or inspecting bencode data.
///
/// Every variant except [`TypeMismatch`](BencodeError::TypeMismatch) and
/// [`MissingKey`](BencodeError::MissingKey) is a format error: the input
/// bytes were not valid bencode and the decode call produced no value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    #[error("invalid string length at offset {0}")]
    InvalidStringLength(usize),

    #[error("declared string length {len} exceeds remaining input at offset {offset}")]
    StringTooLong { len: usize, offset: usize },

    #[error("unexpected byte 0x{byte:02x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    #[error("dictionary key at offset {0} is not a byte string")]
    NonStringKey(usize),

    #[error("trailing data after value at offset {0}")]
    TrailingData(usize),

    #[error("nesting too deep")]
    NestingTooDeep,

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing key: {0}")]
    MissingKey(String),
}

impl BencodeError {
    /// Returns `true` for errors caused by malformed input bytes.
    pub fn is_format_error(&self) -> bool {
        !matches!(
            self,
            BencodeError::TypeMismatch { .. } | BencodeError::MissingKey(_)
        )
    }
}
