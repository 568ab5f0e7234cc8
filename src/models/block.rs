// src/models/block.rs
//! Ledger data model: typed transactions and the blocks that seal them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of lifecycle event a transaction records.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    #[serde(rename = "DID_REGISTRATION")]
    IdentityRegistration,
    #[serde(rename = "VC_ISSUANCE")]
    CredentialIssuance,
    #[serde(rename = "VC_REVOCATION")]
    CredentialRevocation,
    #[serde(rename = "VC_ACCESS_REVOCATION")]
    AccessRevocation,
}

/// A single typed ledger entry with an opaque string payload.
///
/// The ledger never interprets `payload`; callers decide what to record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    #[serde(rename = "data")]
    pub payload: BTreeMap<String, String>,
}

/// A sealed batch of transactions, hash-linked to its predecessor.
///
/// # Invariants
/// - `index` is 1-based and increases by one per block
/// - `previous_hash` equals the hash of the previous block's full record,
///   or the genesis sentinel for block 1
/// - Never mutated once appended to the chain
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Block {
    pub index: u64,

    /// Unix time in seconds (fractional) at sealing
    pub timestamp: f64,

    pub transactions: Vec<Transaction>,

    /// Opaque value supplied by the sealer; not validated
    pub proof: u64,

    pub previous_hash: String,
}
