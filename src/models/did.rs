// src/models/did.rs
//! Decentralized Identifier (DID) data model.
//!
//! An identity here is an opaque unique token naming a participant, tagged
//! with the role that participant plays in the credential lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a registered participant plays.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Signs and revokes credentials
    Issuer,
    /// Subject of credentials; presents them to verifiers
    Holder,
    /// Receives presentations and checks signatures
    Verifier,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Issuer => "issuer",
            Role::Holder => "holder",
            Role::Verifier => "verifier",
        };
        f.write_str(name)
    }
}

/// A registered identity.
///
/// Created once per registration call and never mutated or deleted;
/// revocation applies to credentials, not identities.
///
/// # Serialization
/// Serialized as `{"did": ..., "name": ..., "role": ...}`, the shape the
/// `/show-dids` listing returns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Opaque unique identifier
    /// Example: "3f1c5e0a-6b7d-4e2f-9a41-0c2d8b7e9f10"
    #[serde(rename = "did")]
    pub id: String,

    /// Display name supplied at registration
    #[serde(rename = "name")]
    pub owner_name: String,

    pub role: Role,
}
