// src/utils/crypto.rs
//! Hashing utilities for the ledger.
//!
//! Uses SHA-256 (via `ring`) rendered as lowercase hex.

use ring::digest::{digest, SHA256};

/// Computes a SHA-256 hash of the input data as lowercase hex.
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// 64-character hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(digest(&SHA256, data).as_ref())
}
