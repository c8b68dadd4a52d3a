use super::value::Value;
use bytes::{BufMut, BytesMut};

/// Encodes a bencode value into its canonical byte form.
///
/// - Integers: `i<number>e`
/// - Byte strings: `<length>:<data>`
/// - Lists: `l<items>e`
/// - Dictionaries: `d<key><value>...e`, keys in byte-wise order
///
/// Byte strings are written verbatim, so `encode(&decode(b)?)` reproduces any
/// canonical input `b` exactly.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{encode, Value};
/// use std::collections::BTreeMap;
/// use bytes::Bytes;
///
/// let mut dict = BTreeMap::new();
/// dict.insert(Bytes::from_static(b"b"), Value::Integer(2));
/// dict.insert(Bytes::from_static(b"a"), Value::Integer(1));
/// assert_eq!(encode(&Value::Dict(dict)), b"d1:ai1e1:bi2ee");
/// ```
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_value(value, &mut buf);
    buf.to_vec()
}

fn encode_value(value: &Value, buf: &mut BytesMut) {
    match value {
        Value::Integer(i) => {
            buf.put_u8(b'i');
            buf.put_slice(i.to_string().as_bytes());
            buf.put_u8(b'e');
        }
        Value::Bytes(b) => encode_bytes(b, buf),
        Value::List(l) => {
            buf.put_u8(b'l');
            for item in l {
                encode_value(item, buf);
            }
            buf.put_u8(b'e');
        }
        Value::Dict(d) => {
            // BTreeMap<Bytes, _> iterates in byte-wise key order
            buf.put_u8(b'd');
            for (key, val) in d {
                encode_bytes(key, buf);
                encode_value(val, buf);
            }
            buf.put_u8(b'e');
        }
    }
}

fn encode_bytes(bytes: &[u8], buf: &mut BytesMut) {
    buf.put_slice(bytes.len().to_string().as_bytes());
    buf.put_u8(b':');
    buf.put_slice(bytes);
}
