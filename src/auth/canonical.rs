// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical argument serialization and hashing.
//!
//! This is the single bit-exact contract shared with clients: operation
//! arguments are stringified with recursively sorted object keys, encoded as
//! UTF-8 and hashed with SHA-256, rendered as lowercase hex. Two argument
//! objects with the same content hash identically regardless of key
//! insertion order.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Stable stringify with recursively sorted object keys.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
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
                // serde_json string serialization handles escaping
                out.push_str(&Value::String((*key).clone()).to_string());
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
        // Scalars already have a single serde_json rendering
        other => out.push_str(&other.to_string()),
    }
}

/// Hex SHA-256 of the canonicalized arguments.
pub fn args_hash(args: &Value) -> String {
    let canonical = canonicalize(args);
    let digest = Sha256::digest(canonical.as_bytes());
    hex_encode(&digest)
}

/// Lowercase hex rendering.
pub fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
