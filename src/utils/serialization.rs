// src/utils/serialization.rs
//! Serialization utilities for the DID system.
//!
//! Provides:
//! - Canonical JSON (sorted keys, compact separators) used as the exact byte
//!   input to signing and hashing
//! - Text encodings for binary fields crossing the API boundary

use serde::Serialize;
use serde_json::Value;

/// Serializes a value to canonical JSON bytes.
///
/// The value is first converted into a `serde_json::Value`, whose object
/// representation is an ordered `BTreeMap`, so every nested object comes out
/// with its keys in lexicographic order. Output is compact UTF-8.
///
/// # Arguments
/// * `data` - The value to canonicalize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(Vec<u8>)` with the canonical byte sequence
/// - `Err(serde_json::Error)` if the value cannot be represented as JSON
pub fn canonical_json<T: Serialize>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value: Value = serde_json::to_value(data)?;
    serde_json::to_vec(&value)
}

/// Encodes binary data (signatures) as standard base64 text.
pub fn encode_bytes(data: &[u8]) -> String {
    base64::encode(data)
}
