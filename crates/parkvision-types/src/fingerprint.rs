// SPDX-License-Identifier: Apache-2.0
//! Stable parameter fingerprinting (spec §4.4, §4.8, §8 property 4).
//!
//! A fingerprint must be stable under field-order permutation and
//! numerically-equivalent values (`0.3` and `0.30`), and must differ with
//! overwhelming probability whenever a result-affecting parameter differs.
//! We achieve both by round-tripping through [`serde_json::Value`] (which
//! collapses numeric representations) and re-serializing with sorted keys
//! before hashing.

use serde::Serialize;
use std::collections::BTreeMap;

/// Compute a stable hex fingerprint of `params`' canonical form.
///
/// `params` is first serialized to [`serde_json::Value`], then recursively
/// rewritten so every JSON object's keys are sorted (`BTreeMap` iteration
/// order), then hashed with a 64-bit FNV-1a. The output is 16 lowercase hex
/// characters.
pub fn param_fingerprint<T: Serialize>(params: &T) -> String {
    let value = serde_json::to_value(params).unwrap_or(serde_json::Value::Null);
    let canonical = canonicalize(&value);
    let bytes = canonical.into_bytes();
    format!("{:016x}", fnv1a64(&bytes))
}

/// Rewrite a [`serde_json::Value`] into a canonical string: object keys
/// sorted, numbers normalized via their `f64` representation when they carry
/// a fractional part, otherwise left as their minimal integer form.
fn canonicalize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(f) = n.as_f64() {
                // Normalize so 0.3 and 0.30 collapse to the same token.
                format!("{f:.12e}")
            } else {
                n.to_string()
            }
        }
        serde_json::Value::String(s) => format!("{s:?}"),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<&String, &serde_json::Value> = map.iter().collect();
            let parts: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{k:?}:{}", canonicalize(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
