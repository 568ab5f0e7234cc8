// src/blockchain/ledger.rs
//! Append-only, hash-linked ledger of identity and credential events.
//!
//! Transactions are buffered in a pending list and moved into a new block on
//! every seal. Each block stores the SHA-256 of its predecessor's canonical
//! JSON, so altering any sealed block changes every hash after it.
//!
//! The `proof` on a block is an opaque hook for a future consensus layer. It
//! is stored and hashed but never validated; sealing is a checkpoint, not a
//! security mechanism.

use crate::error::Result;
use crate::models::block::{Block, Transaction, TransactionType};
use crate::utils::crypto::sha256_hex;
use crate::utils::serialization::canonical_json;
use chrono::Utc;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Proof value of the genesis block unless configured otherwise.
pub const GENESIS_PROOF: u64 = 100;

/// A structural defect found while walking the chain.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("chain is empty")]
    Empty,

    #[error("genesis block has previous hash {0:?}")]
    BadGenesis(String),

    #[error("block at position {position} has index {index}")]
    IndexOutOfSequence { position: usize, index: u64 },

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("block could not be hashed: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Chain and pending buffer, always mutated together.
struct LedgerState {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

/// In-memory ledger with a single writer at a time.
///
/// Block index and `previous_hash` depend on total order, so the chain and
/// pending buffer sit behind one mutex.
pub struct Ledger {
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// Creates a ledger containing only the genesis block.
    pub fn new() -> Result<Self> {
        Self::with_genesis_proof(GENESIS_PROOF)
    }

    /// Creates a ledger whose genesis block carries `proof`.
    pub fn with_genesis_proof(proof: u64) -> Result<Self> {
        let mut state = LedgerState {
            chain: Vec::new(),
            pending: Vec::new(),
        };
        Self::seal_locked(&mut state, proof)?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Every critical section leaves chain and pending consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Computes the hash of a block.
    ///
    /// SHA-256 over the canonical JSON of the full record, including its own
    /// `previous_hash` and transactions.
    pub fn hash(block: &Block) -> std::result::Result<String, serde_json::Error> {
        Ok(sha256_hex(&canonical_json(block)?))
    }

    /// Buffers a transaction for the next block.
    ///
    /// # Returns
    /// Index of the block that will contain the transaction
    pub fn record(&self, transaction_type: TransactionType, payload: BTreeMap<String, String>) -> u64 {
        let mut state = self.lock();
        Self::record_locked(&mut state, transaction_type, payload)
    }

    /// Seals every pending transaction into a new block.
    ///
    /// A seal with nothing pending still appends an (empty) block.
    pub fn seal(&self, proof: u64) -> Result<Block> {
        let mut state = self.lock();
        Self::seal_locked(&mut state, proof)
    }

    /// Records one transaction and seals it in a single critical section.
    ///
    /// Concurrent callers cannot interleave between the two steps, so the
    /// returned block contains exactly the transaction passed here plus
    /// whatever was already pending.
    pub fn record_and_seal(
        &self,
        transaction_type: TransactionType,
        payload: BTreeMap<String, String>,
        proof: u64,
    ) -> Result<Block> {
        let mut state = self.lock();
        Self::record_locked(&mut state, transaction_type, payload);
        Self::seal_locked(&mut state, proof)
    }

    fn record_locked(
        state: &mut LedgerState,
        transaction_type: TransactionType,
        payload: BTreeMap<String, String>,
    ) -> u64 {
        debug!("Recording {:?} transaction", transaction_type);
        state.pending.push(Transaction {
            transaction_type,
            payload,
        });
        state.chain.len() as u64 + 1
    }

    fn seal_locked(state: &mut LedgerState, proof: u64) -> Result<Block> {
        let previous_hash = match state.chain.last() {
            Some(last) => Self::hash(last)?,
            None => GENESIS_PREVIOUS_HASH.to_string(),
        };

        let block = Block {
            index: state.chain.len() as u64 + 1,
            timestamp: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            transactions: std::mem::take(&mut state.pending),
            proof,
            previous_hash,
        };
        info!(
            "Sealed block {} with {} transaction(s)",
            block.index,
            block.transactions.len()
        );
        state.chain.push(block.clone());
        Ok(block)
    }

    /// Returns the most recently sealed block.
    pub fn last_block(&self) -> Option<Block> {
        self.lock().chain.last().cloned()
    }

    /// Returns a snapshot of the whole chain, genesis first.
    pub fn chain(&self) -> Vec<Block> {
        self.lock().chain.clone()
    }

    /// Number of sealed blocks (including genesis).
    pub fn len(&self) -> usize {
        self.lock().chain.len()
    }

    /// Always `false` for a ledger built through its constructors, which
    /// seal a genesis block.
    pub fn is_empty(&self) -> bool {
        self.lock().chain.is_empty()
    }

    /// Transactions recorded but not yet sealed.
    pub fn pending(&self) -> Vec<Transaction> {
        self.lock().pending.clone()
    }

    /// Walks the current chain and reports the first structural defect.
    pub fn validate(&self) -> std::result::Result<(), LedgerError> {
        let chain = self.chain();
        Self::validate_blocks(&chain)
    }

    /// Checks sentinel, index sequence and hash links of `blocks`.
    pub fn validate_blocks(blocks: &[Block]) -> std::result::Result<(), LedgerError> {
        let genesis = blocks.first().ok_or(LedgerError::Empty)?;
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return Err(LedgerError::BadGenesis(genesis.previous_hash.clone()));
        }

        for (position, block) in blocks.iter().enumerate() {
            if block.index != position as u64 + 1 {
                return Err(LedgerError::IndexOutOfSequence {
                    position,
                    index: block.index,
                });
            }
        }

        for pair in blocks.windows(2) {
            if pair[1].previous_hash != Self::hash(&pair[0])? {
                return Err(LedgerError::BrokenLink { index: pair[1].index });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_genesis_block() {
        let ledger = Ledger::new().unwrap();
        let chain = ledger.chain();

        assert_eq!(chain.len(), 1);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_empty());
        assert_eq!(chain[0].index, 1);
        assert_eq!(chain[0].previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(chain[0].proof, GENESIS_PROOF);
        assert!(chain[0].transactions.is_empty());
    }

    #[test]
    fn test_record_returns_next_block_index() {
        let ledger = Ledger::new().unwrap();
        let next = ledger.record(TransactionType::IdentityRegistration, payload(&[("did", "a")]));
        assert_eq!(next, 2);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn test_seal_moves_pending_into_block() {
        let ledger = Ledger::new().unwrap();
        ledger.record(TransactionType::IdentityRegistration, payload(&[("did", "a")]));
        ledger.record(TransactionType::IdentityRegistration, payload(&[("did", "b")]));

        let block = ledger.seal(12345).unwrap();

        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 12345);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[1].payload["did"], "b");
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.last_block().unwrap(), block);
    }

    #[test]
    fn test_every_seal_adds_exactly_one_block() {
        let ledger = Ledger::new().unwrap();
        ledger.seal(1).unwrap();
        assert_eq!(ledger.len(), 2);

        for _ in 0..3 {
            ledger.record(TransactionType::CredentialIssuance, BTreeMap::new());
        }
        ledger.seal(2).unwrap();
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_blocks_link_to_predecessor_hash() {
        let ledger = Ledger::new().unwrap();
        for i in 0..4 {
            ledger.record_and_seal(
                TransactionType::CredentialRevocation,
                payload(&[("credential_id", i.to_string().as_str())]),
                i,
            )
            .unwrap();
        }

        let chain = ledger.chain();
        for n in 1..chain.len() {
            assert_eq!(chain[n].previous_hash, Ledger::hash(&chain[n - 1]).unwrap());
        }
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn test_record_and_seal_contains_only_its_transaction() {
        let ledger = Ledger::new().unwrap();
        let block = ledger
            .record_and_seal(TransactionType::AccessRevocation, payload(&[("holder_did", "h")]), 7)
            .unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].transaction_type, TransactionType::AccessRevocation);
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let ledger = Ledger::new().unwrap();
        let hash = Ledger::hash(&ledger.chain()[0]).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_validate_detects_tampered_transaction() {
        let ledger = Ledger::new().unwrap();
        ledger
            .record_and_seal(TransactionType::CredentialIssuance, payload(&[("credential_id", "c1")]), 1)
            .unwrap();
        ledger.seal(1).unwrap();

        let mut chain = ledger.chain();
        chain[1].transactions[0]
            .payload
            .insert("credential_id".into(), "forged".into());

        assert!(matches!(
            Ledger::validate_blocks(&chain),
            Err(LedgerError::BrokenLink { index: 3 })
        ));
    }

    #[test]
    fn test_validate_detects_bad_genesis_and_gaps() {
        let ledger = Ledger::new().unwrap();
        ledger.seal(1).unwrap();

        let mut chain = ledger.chain();
        chain[0].previous_hash = "0".into();
        assert!(matches!(Ledger::validate_blocks(&chain), Err(LedgerError::BadGenesis(_))));

        let mut chain = ledger.chain();
        chain[1].index = 5;
        assert!(matches!(
            Ledger::validate_blocks(&chain),
            Err(LedgerError::IndexOutOfSequence { position: 1, index: 5 })
        ));

        assert!(matches!(Ledger::validate_blocks(&[]), Err(LedgerError::Empty)));
    }

    #[test]
    fn test_transaction_wire_names() {
        let tx = Transaction {
            transaction_type: TransactionType::AccessRevocation,
            payload: payload(&[("verifier_did", "v")]),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "VC_ACCESS_REVOCATION");
        assert_eq!(json["data"]["verifier_did"], "v");
    }
}
