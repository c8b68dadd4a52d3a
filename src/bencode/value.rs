use super::error::BencodeError;
use bytes::Bytes;
use std::collections::BTreeMap;

/// A bencode value.
///
/// Byte strings are kept as raw [`Bytes`]; they are never decoded as text, so
/// binary fields such as concatenated piece hashes survive a decode/encode
/// cycle unchanged.
///
/// The `as_*` accessors return `Option` for lookups where absence is
/// expected. The `expect_*` accessors and [`require`](Value::require) return a
/// [`BencodeError`] naming the mismatch instead.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{decode, Value};
///
/// let value = decode(b"d4:name4:spam6:lengthi42ee").unwrap();
/// assert_eq!(value.require(b"length").unwrap().expect_integer().unwrap(), 42);
/// assert!(value.require(b"name").unwrap().expect_integer().is_err());
/// assert!(value.require(b"missing").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A signed 64-bit integer.
    Integer(i64),
    /// A byte string (may or may not be valid UTF-8).
    Bytes(Bytes),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A dictionary with byte string keys, iterated in byte-wise key order.
    Dict(BTreeMap<Bytes, Value>),
}

impl Value {
    /// Creates a byte string value from a UTF-8 string.
    pub fn string(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "byte string",
            Value::List(_) => "list",
            Value::Dict(_) => "dictionary",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a UTF-8 string, if it is a valid UTF-8 byte string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Bytes, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Consumes the value and returns the dictionary, if it is one.
    pub fn into_dict(self) -> Option<BTreeMap<Bytes, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Looks up a key in this value if it is a dictionary.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }

    pub fn expect_integer(&self) -> Result<i64, BencodeError> {
        self.as_integer().ok_or_else(|| self.mismatch("integer"))
    }

    pub fn expect_bytes(&self) -> Result<&Bytes, BencodeError> {
        self.as_bytes().ok_or_else(|| self.mismatch("byte string"))
    }

    /// Like [`expect_bytes`](Value::expect_bytes), but also requires valid UTF-8.
    pub fn expect_str(&self) -> Result<&str, BencodeError> {
        let bytes = self.expect_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| BencodeError::TypeMismatch {
            expected: "utf-8 string",
            found: "binary byte string",
        })
    }

    pub fn expect_list(&self) -> Result<&Vec<Value>, BencodeError> {
        self.as_list().ok_or_else(|| self.mismatch("list"))
    }

    pub fn expect_dict(&self) -> Result<&BTreeMap<Bytes, Value>, BencodeError> {
        self.as_dict().ok_or_else(|| self.mismatch("dictionary"))
    }

    /// Looks up a key that must be present.
    ///
    /// Fails with `TypeMismatch` if `self` is not a dictionary and with
    /// `MissingKey` if the key is absent.
    pub fn require(&self, key: &[u8]) -> Result<&Value, BencodeError> {
        self.expect_dict()?
            .get(key)
            .ok_or_else(|| BencodeError::MissingKey(String::from_utf8_lossy(key).into_owned()))
    }

    fn mismatch(&self, expected: &'static str) -> BencodeError {
        BencodeError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<BTreeMap<Bytes, Value>> for Value {
    fn from(d: BTreeMap<Bytes, Value>) -> Self {
        Value::Dict(d)
    }
}
