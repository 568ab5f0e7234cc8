// src/error.rs
//! Error taxonomy shared by the registry, credential engine and ledger.

use thiserror::Error;

/// Errors surfaced by the core operations.
///
/// `NotFound` and `Unauthorized` are kept apart internally so callers and
/// tests can tell them apart; the HTTP layer folds both into a 404.
#[derive(Error, Debug)]
pub enum DidError {
    /// Missing or malformed required field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown identifier, credential, or presentation grant.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requester is not the issuer/subject the operation requires.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The identifier generator produced a taken id twice in a row.
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// Canonical JSON could not be produced.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key generation, key export or signing failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DidError>;
