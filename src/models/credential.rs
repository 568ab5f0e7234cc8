// src/models/credential.rs
//! Verifiable Credential data model implementation.
//!
//! Defines the W3C-shaped credential document that gets signed, and the
//! stored record pairing it with its signature and signer key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON-LD context every issued credential carries.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Credential type every issued credential carries.
pub const CREDENTIAL_TYPE: &str = "VerifiableCredential";

/// The subject section of a credential: the holder's id plus flattened claims.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialSubject {
    /// DID of the credential subject (the holder)
    pub id: String,

    /// Claims asserted about the subject, serialized alongside `id`
    #[serde(flatten)]
    pub claims: BTreeMap<String, String>,
}

/// The signed body of a Verifiable Credential.
///
/// Follows the [W3C Verifiable Credentials Data Model](https://www.w3.org/TR/vc-data-model/)
/// field names. The canonical JSON of this struct is the exact byte input to
/// signing and verification; the signature and signer key live outside it in
/// [`IssuedCredential`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub credential_type: Vec<String>,

    /// DID of the credential issuer
    pub issuer: String,

    /// RFC3339 UTC issuance time with `Z` suffix
    /// Example: "2024-05-01T12:00:00.123456Z"
    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,

    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
}

impl VerifiableCredential {
    /// Builds a credential body with the standard context and type.
    pub fn new(
        issuer: String,
        subject: String,
        claims: BTreeMap<String, String>,
        issuance_date: String,
    ) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            credential_type: vec![CREDENTIAL_TYPE.to_string()],
            issuer,
            issuance_date,
            credential_subject: CredentialSubject { id: subject, claims },
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.credential_subject.id
    }
}

/// A credential as held in the engine's table.
///
/// # Security Considerations
/// - `public_key` is a fresh key generated for this credential only, so a
///   successful check proves self-consistency of the stored record, not that
///   the issuer DID controls the key
/// - Issuer-level trust needs a persistent, resolvable issuer key
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IssuedCredential {
    pub credential_id: String,

    pub credential: VerifiableCredential,

    /// Signature bytes over the canonical JSON of `credential`
    pub signature: Vec<u8>,

    /// SubjectPublicKeyInfo PEM of the per-credential signing key
    pub public_key: String,
}

impl IssuedCredential {
    pub fn issuer_id(&self) -> &str {
        &self.credential.issuer
    }

    pub fn subject_id(&self) -> &str {
        self.credential.subject_id()
    }
}
