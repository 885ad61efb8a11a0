//! Canonical JSON encoding used anywhere a byte string is hashed or signed:
//! the bulletin chain, ballot hashing, and vote-hash generation all depend
//! on every party producing the exact same bytes for the same logical value.
//!
//! Canonicalization recursively key-sorts objects; arrays keep their order
//! and numbers/strings serialize exactly as `serde_json` would.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Re-serializes `value` with every object's keys sorted lexicographically,
/// recursively. This is the byte string that gets hashed, never the
/// original (insertion-ordered) encoding.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Convenience wrapper for callers holding a `Serialize` value rather than
/// an already-parsed `serde_json::Value`.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    Ok(canonicalize(&v))
}

/// sha256(canonical_json(value)), hex-encoded.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = canonical_json(value)?;
    Ok(hex::encode(Sha256::digest(bytes.as_bytes())))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string keys always serialize"));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_sorts_recursively() {
        let a = json!({"b": 2, "a": {"z": 1, "y": 2}});
        let b = json!({"a": {"y": 2, "z": 1}, "b": 2});
        assert_eq!(canonicalize(&a), canonicalize(&b));
        assert_eq!(canonicalize(&a), r#"{"a":{"y":2,"z":1},"b":2}"#);
    }

    #[test]
    fn arrays_preserve_order() {
        let v = json!({"xs": [3, 1, 2]});
        assert_eq!(canonicalize(&v), r#"{"xs":[3,1,2]}"#);
    }

    #[test]
    fn hash_is_order_independent() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }
}
