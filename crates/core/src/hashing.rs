//! Deterministic hashing helpers.
//!
//! `stable_stringify` relies on `serde_json`'s default map representation
//! (a `BTreeMap`, since this workspace never enables the `preserve_order`
//! feature) to produce byte-identical JSON for structurally-equal values
//! regardless of field insertion order — the property both the execution
//! result identity and the deterministic operation id
//! depend on.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serialize `value` to JSON with sorted object keys.
pub fn stable_stringify<T: Serialize>(value: &T) -> crate::Result<String> {
    let as_value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&as_value)?)
}

/// `sha256(bytes)` as a lowercase hex string.
pub fn hash256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// `sha256` of the stable JSON stringification of `value`.
pub fn hash256_of<T: Serialize>(value: &T) -> crate::Result<String> {
    Ok(hash256_hex(stable_stringify(value)?.as_bytes()))
}

/// First `n` hex characters of a hash (used for the 40-char operation id).
pub fn truncate_hex(hex_str: &str, n: usize) -> String {
    hex_str.chars().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stable_stringify_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(stable_stringify(&a).unwrap(), stable_stringify(&b).unwrap());
    }

    #[test]
    fn hash256_is_deterministic() {
        let h1 = hash256_hex(b"hello");
        let h2 = hash256_hex(b"hello");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn truncate_hex_takes_prefix() {
        assert_eq!(truncate_hex("abcdef0123456789", 6), "abcdef");
    }
}
