use super::error::BencodeError;
use super::value::Value;
use bytes::Bytes;
use std::collections::BTreeMap;

const MAX_DEPTH: usize = 64;

/// Decodes a single bencode value that must span the whole input.
///
/// # Errors
///
/// Fails if the input is malformed or if bytes remain after the value.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{decode, Value};
///
/// assert_eq!(decode(b"i-7e").unwrap(), Value::Integer(-7));
/// assert!(decode(b"i1ei2e").is_err());
/// ```
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let (value, consumed) = decode_prefix(data)?;

    if consumed != data.len() {
        return Err(BencodeError::TrailingData(consumed));
    }

    Ok(value)
}

/// Decodes one value from the start of `data`.
///
/// Returns the value and the number of bytes it occupied. Anything after
/// that position is left untouched.
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    let mut pos = 0;
    let value = decode_value(data, &mut pos, 0)?;
    Ok((value, pos))
}

fn decode_value(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    if depth > MAX_DEPTH {
        return Err(BencodeError::NestingTooDeep);
    }

    let Some(&lead) = data.get(*pos) else {
        return Err(BencodeError::UnexpectedEof(*pos));
    };

    match lead {
        b'i' => decode_integer(data, pos),
        b'l' => decode_list(data, pos, depth),
        b'd' => decode_dict(data, pos, depth),
        b'0'..=b'9' => decode_bytes(data, pos).map(Value::Bytes),
        byte => Err(BencodeError::UnexpectedByte {
            byte,
            offset: *pos,
        }),
    }
}

fn decode_integer(data: &[u8], pos: &mut usize) -> Result<Value, BencodeError> {
    *pos += 1;

    let start = *pos;
    while *pos < data.len() && data[*pos] != b'e' {
        *pos += 1;
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof(*pos));
    }

    let int_str = std::str::from_utf8(&data[start..*pos])
        .map_err(|_| BencodeError::InvalidInteger("invalid utf8".into()))?;

    if int_str.is_empty() {
        return Err(BencodeError::InvalidInteger("empty".into()));
    }

    if int_str.starts_with("-0") || (int_str.starts_with('0') && int_str.len() > 1) {
        return Err(BencodeError::InvalidInteger("leading zeros".into()));
    }

    // i64::from_str accepts a leading '+', bencode does not
    if int_str.starts_with('+') {
        return Err(BencodeError::InvalidInteger(int_str.into()));
    }

    let value: i64 = int_str
        .parse()
        .map_err(|_| BencodeError::InvalidInteger(int_str.into()))?;

    *pos += 1;
    Ok(Value::Integer(value))
}

fn decode_bytes(data: &[u8], pos: &mut usize) -> Result<Bytes, BencodeError> {
    let start = *pos;
    while *pos < data.len() && data[*pos].is_ascii_digit() {
        *pos += 1;
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof(*pos));
    }

    if data[*pos] != b':' {
        return Err(BencodeError::InvalidStringLength(start));
    }

    let len_str =
        std::str::from_utf8(&data[start..*pos]).map_err(|_| BencodeError::InvalidStringLength(start))?;

    let len: usize = len_str
        .parse()
        .map_err(|_| BencodeError::InvalidStringLength(start))?;

    *pos += 1;

    if len > data.len() - *pos {
        return Err(BencodeError::StringTooLong { len, offset: *pos });
    }

    let bytes = Bytes::copy_from_slice(&data[*pos..*pos + len]);
    *pos += len;

    Ok(bytes)
}

fn decode_list(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    *pos += 1;
    let mut list = Vec::new();

    while *pos < data.len() && data[*pos] != b'e' {
        list.push(decode_value(data, pos, depth + 1)?);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof(*pos));
    }

    *pos += 1;
    Ok(Value::List(list))
}

fn decode_dict(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    *pos += 1;
    let mut dict = BTreeMap::new();

    while *pos < data.len() && data[*pos] != b'e' {
        if !data[*pos].is_ascii_digit() {
            return Err(BencodeError::NonStringKey(*pos));
        }
        let key = decode_bytes(data, pos)?;

        let value = decode_value(data, pos, depth + 1)?;
        dict.insert(key, value);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof(*pos));
    }

    *pos += 1;
    Ok(Value::Dict(dict))
}
