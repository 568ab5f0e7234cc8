// src/services/did_system.rs
//! DID System context
//!
//! Owns the identity registry, credential engine and ledger, and exposes the
//! operations the HTTP front end calls. Each operation:
//! 1. Checks authorization (requester must be the credential's issuer for
//!    revocation, its subject for presentation and access revocation)
//! 2. Performs the mutation on the registry or engine
//! 3. Records exactly one ledger transaction and seals exactly one block,
//!    for every auditable change
//!
//! Revocations seal their block while the engine's storage lock is held, so
//! the chain lists them in the order the state actually changed.
//!
//! Presentation is not audited and leaves the ledger untouched.

use crate::blockchain::ledger::Ledger;
use crate::error::{DidError, Result};
use crate::models::block::{Block, TransactionType};
use crate::models::credential::IssuedCredential;
use crate::models::did::{IdentityRecord, Role};
use crate::services::credential_engine::CredentialEngine;
use crate::services::identity_registry::IdentityRegistry;
use crate::settings::LedgerSettings;
use log::{debug, error, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Injectable state for one DID system instance.
///
/// Cheap to clone; clones share the same registry, engine and ledger.
#[derive(Clone)]
pub struct DidSystem {
    identities: Arc<IdentityRegistry>,
    credentials: Arc<CredentialEngine>,
    ledger: Arc<Ledger>,
    /// Proof stamped on every block this context seals
    seal_proof: u64,
}

impl DidSystem {
    /// Creates an empty system with a fresh genesis block.
    pub fn new(settings: &LedgerSettings) -> Result<Self> {
        Ok(Self::from_parts(
            IdentityRegistry::new(),
            CredentialEngine::new(),
            Ledger::with_genesis_proof(settings.genesis_proof)?,
            settings.seal_proof,
        ))
    }

    /// Assembles a system from existing components.
    pub fn from_parts(
        identities: IdentityRegistry,
        credentials: CredentialEngine,
        ledger: Ledger,
        seal_proof: u64,
    ) -> Self {
        Self {
            identities: Arc::new(identities),
            credentials: Arc::new(credentials),
            ledger: Arc::new(ledger),
            seal_proof,
        }
    }

    fn commit(&self, transaction_type: TransactionType, payload: &[(&str, &str)]) -> Result<Block> {
        let payload: BTreeMap<String, String> = payload
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.ledger
            .record_and_seal(transaction_type, payload, self.seal_proof)
    }

    /// Looks up a credential the requester must be a party to.
    ///
    /// `expected` picks which party (issuer or subject) has to match.
    fn authorize(
        &self,
        credential_id: &str,
        requester_id: &str,
        expected: fn(&IssuedCredential) -> &str,
    ) -> Result<IssuedCredential> {
        let credential = self
            .credentials
            .get(credential_id)
            .ok_or_else(|| DidError::NotFound(format!("credential {}", credential_id)))?;

        if expected(&credential) != requester_id {
            warn!(
                "{} is not authorized to act on credential {}",
                requester_id, credential_id
            );
            return Err(DidError::Unauthorized(format!(
                "{} on credential {}",
                requester_id, credential_id
            )));
        }
        Ok(credential)
    }

    /// Registers a participant and records a `DID_REGISTRATION` transaction.
    pub fn register_identity(&self, name: &str, role: Role) -> Result<IdentityRecord> {
        let record = self.identities.register(name, role)?;
        let role = role.to_string();
        self.commit(
            TransactionType::IdentityRegistration,
            &[("did", record.id.as_str()), ("name", name), ("role", role.as_str())],
        )?;
        Ok(record)
    }

    /// Issues a credential and records a `VC_ISSUANCE` transaction.
    ///
    /// No prior authorization is required to issue.
    pub fn issue_credential(
        &self,
        issuer_id: &str,
        subject_id: &str,
        claims: BTreeMap<String, String>,
    ) -> Result<IssuedCredential> {
        let issuer_name = self
            .identities
            .name_of(issuer_id)
            .unwrap_or_else(|| "unknown issuer".to_string());
        debug!("Issuer name: {}", issuer_name);

        let issued = self.credentials.issue(issuer_id, subject_id, claims)?;
        self.commit(
            TransactionType::CredentialIssuance,
            &[
                ("issuer_did", issuer_id),
                ("subject_did", subject_id),
                ("credential_id", issued.credential_id.as_str()),
            ],
        )?;
        Ok(issued)
    }

    /// Discloses a credential to a verifier on behalf of its holder.
    ///
    /// # Errors
    /// - `NotFound` if the credential is unknown or revoked
    /// - `Unauthorized` if `holder_id` is not the credential's subject
    pub fn present_credential(
        &self,
        credential_id: &str,
        holder_id: &str,
        verifier_id: &str,
    ) -> Result<()> {
        self.authorize(credential_id, holder_id, IssuedCredential::subject_id)?;
        self.credentials.present(credential_id, verifier_id)
    }

    /// Whether the stored credential's signature is intact.
    pub fn verify_credential(&self, credential_id: &str) -> bool {
        self.credentials.verify(credential_id)
    }

    /// Revokes a credential on behalf of its issuer and records a
    /// `VC_REVOCATION` transaction.
    ///
    /// # Errors
    /// - `NotFound` if the credential is unknown or already revoked
    /// - `Unauthorized` if `issuer_id` did not issue the credential
    pub fn revoke_credential(&self, credential_id: &str, issuer_id: &str) -> Result<()> {
        self.authorize(credential_id, issuer_id, IssuedCredential::issuer_id)?;
        let revoked = self.credentials.revoke_audited(credential_id, || {
            self.commit(
                TransactionType::CredentialRevocation,
                &[("issuer_did", issuer_id), ("credential_id", credential_id)],
            )
            .map(|_| ())
        })?;
        if !revoked {
            // Lost a race with a concurrent revocation.
            return Err(DidError::NotFound(format!("credential {}", credential_id)));
        }
        Ok(())
    }

    /// Withdraws a presentation on behalf of the holder and records a
    /// `VC_ACCESS_REVOCATION` transaction.
    ///
    /// # Errors
    /// - `NotFound` if the credential is unknown or the verifier was never
    ///   granted presentation
    /// - `Unauthorized` if `holder_id` is not the credential's subject
    pub fn revoke_access(
        &self,
        credential_id: &str,
        holder_id: &str,
        verifier_id: &str,
    ) -> Result<()> {
        self.authorize(credential_id, holder_id, IssuedCredential::subject_id)?;
        self.credentials
            .revoke_access_audited(credential_id, verifier_id, || {
                self.commit(
                    TransactionType::AccessRevocation,
                    &[
                        ("holder_did", holder_id),
                        ("verifier_did", verifier_id),
                        ("credential_id", credential_id),
                    ],
                )
                .map(|_| ())
            })
    }

    /// Every sealed block, genesis first.
    pub fn dump_chain(&self) -> Vec<Block> {
        self.ledger.chain()
    }

    /// Every registered identity, in registration order.
    pub fn dump_identities(&self) -> Vec<IdentityRecord> {
        self.identities.all()
    }

    /// Whether every block still links to its predecessor.
    pub fn validate_chain(&self) -> bool {
        match self.ledger.validate() {
            Ok(()) => true,
            Err(e) => {
                error!("Ledger validation failed: {}", e);
                false
            }
        }
    }

    pub fn credentials(&self) -> &CredentialEngine {
        &self.credentials
    }
}
