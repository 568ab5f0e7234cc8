// src/lib.rs

//! # DID Ledger
//!
//! Issues, presents, verifies and revokes W3C-style Verifiable Credentials
//! anchored to Decentralized Identifiers, recording every lifecycle event in
//! an append-only, hash-linked ledger.
//!
//! ## Architecture Overview
//! 1. **Registry Layer**: `IdentityRegistry` hands out role-tagged identifiers
//! 2. **Credential Layer**: `CredentialEngine` signs, verifies and tracks presentations
//! 3. **Ledger Layer**: `Ledger` batches transactions into hash-linked blocks
//! 4. **Context**: `DidSystem` ties the three together and pairs each change with a block
//! 5. **Front End**: `ApiServer` exposes the context over HTTP

// Module declarations (organized by functional domain)
pub mod blockchain; // Hash-linked ledger
pub mod error; // Error taxonomy
pub mod models; // Data structures
pub mod services; // Registry, engine, context and API
pub mod settings; // Layered configuration
pub mod utils; // Canonical JSON and hashing helpers
pub mod wallet; // Per-credential keys and credential table

pub use error::{DidError, Result};
pub use services::did_system::DidSystem;
