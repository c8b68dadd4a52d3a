use super::value::Value;
use serde_json::{json, Map};

/// Renders a bencode value as JSON for diagnostic inspection.
///
/// Byte strings that are valid UTF-8 become JSON strings. Anything else
/// becomes `{"hex": "..."}` so binary fields are shown without loss.
/// Dictionary keys that are not UTF-8 are rendered as `hex:<digits>`.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{decode, to_json};
///
/// let value = decode(b"d4:name3:abc6:pieces2:\xff\x00e").unwrap();
/// let json = to_json(&value);
/// assert_eq!(json["name"], "abc");
/// assert_eq!(json["pieces"]["hex"], "ff00");
/// ```
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(i) => json!(i),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => json!(s),
            Err(_) => json!({ "hex": hex::encode(b) }),
        },
        Value::List(l) => serde_json::Value::Array(l.iter().map(to_json).collect()),
        Value::Dict(d) => {
            let mut map = Map::with_capacity(d.len());
            for (key, val) in d {
                let key = match std::str::from_utf8(key) {
                    Ok(s) => s.to_owned(),
                    Err(_) => format!("hex:{}", hex::encode(key)),
                };
                map.insert(key, to_json(val));
            }
            serde_json::Value::Object(map)
        }
    }
}
