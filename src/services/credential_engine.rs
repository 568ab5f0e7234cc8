// src/services/credential_engine.rs
//! Credential Engine
//!
//! Issues signed Verifiable Credentials, checks their signatures, and tracks
//! which verifiers each credential has been presented to.
//!
//! Lifecycle per credential is `Active -> Revoked`. Revocation deletes the
//! record and its presentation set, so a revoked id is indistinguishable from
//! one that never existed.
//!
//! Authorization (who may present or revoke) is the caller's concern; see
//! `DidSystem`.

use crate::error::{DidError, Result};
use crate::models::credential::{IssuedCredential, VerifiableCredential};
use crate::utils::serialization::canonical_json;
use crate::wallet::credential_storage::CredentialStorage;
use crate::wallet::key_management::{verify_signature, KeyManager, VerificationError};
use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Service for issuing, verifying and revoking credentials.
///
/// The credential table and presentation sets share one lock, so concurrent
/// present/revoke calls on the same credential cannot lose updates.
#[derive(Default)]
pub struct CredentialEngine {
    storage: Mutex<CredentialStorage>,
}

impl CredentialEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn storage(&self) -> MutexGuard<'_, CredentialStorage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues a new credential signed by a freshly generated key.
    ///
    /// # Process Flow
    /// 1. Builds the credential body stamped with the current UTC time
    /// 2. Generates a keypair for this credential only
    /// 3. Signs the canonical JSON of the body
    /// 4. Stores body, signature and PEM public key under a new credential id
    ///
    /// # Errors
    /// - `InvalidInput` if issuer or subject is empty, claims are empty, or a
    ///   claim is named `id`
    /// - `Serialization` / `Signing` if the body or key cannot be encoded
    pub fn issue(
        &self,
        issuer_id: &str,
        subject_id: &str,
        claims: BTreeMap<String, String>,
    ) -> Result<IssuedCredential> {
        if issuer_id.trim().is_empty() {
            return Err(DidError::InvalidInput("issuer id is required".into()));
        }
        if subject_id.trim().is_empty() {
            return Err(DidError::InvalidInput("subject id is required".into()));
        }
        if claims.is_empty() {
            return Err(DidError::InvalidInput("at least one claim is required".into()));
        }
        if claims.contains_key("id") {
            return Err(DidError::InvalidInput(
                "claim name \"id\" is reserved for the subject".into(),
            ));
        }

        let credential = VerifiableCredential::new(
            issuer_id.to_string(),
            subject_id.to_string(),
            claims,
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        );

        let keys = KeyManager::generate();
        let signature = keys.sign_message(&canonical_json(&credential)?);
        let public_key = keys
            .public_key_pem()
            .map_err(|e| DidError::Signing(e.to_string()))?;

        let issued = IssuedCredential {
            credential_id: Uuid::new_v4().to_string(),
            credential,
            signature,
            public_key,
        };
        debug!(
            "Issued credential {} from {} to {}",
            issued.credential_id, issuer_id, subject_id
        );

        self.storage().store_credential(issued.clone());
        Ok(issued)
    }

    /// Checks the stored signature against the stored key and body.
    ///
    /// This is a self-consistency check: it proves the record has not been
    /// altered since signing, not that the issuer DID owns the key.
    pub fn check(&self, credential_id: &str) -> std::result::Result<(), VerificationError> {
        let issued = self
            .get(credential_id)
            .ok_or_else(|| VerificationError::UnknownCredential(credential_id.to_string()))?;

        let message =
            canonical_json(&issued.credential).map_err(|_| VerificationError::Canonicalization)?;
        verify_signature(&issued.public_key, &message, &issued.signature)
    }

    /// Boolean form of [`check`](Self::check). Never fails; the cause of a
    /// `false` is only logged.
    pub fn verify(&self, credential_id: &str) -> bool {
        match self.check(credential_id) {
            Ok(()) => true,
            Err(e) => {
                warn!("Verification failed for credential {}: {}", credential_id, e);
                false
            }
        }
    }

    /// Records that the credential was disclosed to `verifier_id`.
    ///
    /// Presenting twice to the same verifier is a no-op.
    ///
    /// # Errors
    /// `NotFound` if the credential is unknown or revoked
    pub fn present(&self, credential_id: &str, verifier_id: &str) -> Result<()> {
        if !self.storage().add_presentation(credential_id, verifier_id) {
            return Err(DidError::NotFound(format!("credential {}", credential_id)));
        }
        debug!("Credential {} presented to {}", credential_id, verifier_id);
        Ok(())
    }

    /// Deletes the credential and its presentation set.
    ///
    /// # Returns
    /// `true` if a credential was removed; `false` for unknown or already
    /// revoked ids.
    pub fn revoke(&self, credential_id: &str) -> bool {
        matches!(self.revoke_audited(credential_id, || Ok(())), Ok(true))
    }

    /// Like [`revoke`](Self::revoke), but runs `audit` under the storage lock
    /// just before the removal.
    ///
    /// Audit records therefore reach the ledger in the same order as the
    /// changes they describe. If `audit` fails, nothing is removed.
    pub fn revoke_audited<F>(&self, credential_id: &str, audit: F) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut storage = self.storage();
        if !storage.contains_credential(credential_id) {
            return Ok(false);
        }
        audit()?;
        storage.remove_credential(credential_id);
        debug!("Revoked credential {}", credential_id);
        Ok(true)
    }

    /// Withdraws a previous presentation to `verifier_id`.
    ///
    /// # Errors
    /// `NotFound` if the verifier was never granted presentation
    pub fn revoke_access(&self, credential_id: &str, verifier_id: &str) -> Result<()> {
        self.revoke_access_audited(credential_id, verifier_id, || Ok(()))
    }

    /// Like [`revoke_access`](Self::revoke_access), with `audit` run under
    /// the storage lock before the grant is removed.
    pub fn revoke_access_audited<F>(&self, credential_id: &str, verifier_id: &str, audit: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut storage = self.storage();
        if !storage.has_presentation(credential_id, verifier_id) {
            return Err(DidError::NotFound(format!(
                "presentation of {} to {}",
                credential_id, verifier_id
            )));
        }
        audit()?;
        storage.remove_presentation(credential_id, verifier_id);
        debug!("Revoked access of {} to credential {}", verifier_id, credential_id);
        Ok(())
    }

    /// Returns a copy of an active credential.
    pub fn get(&self, credential_id: &str) -> Option<IssuedCredential> {
        self.storage().get_credential(credential_id).cloned()
    }

    /// Verifiers the credential is currently presented to.
    pub fn presented_to(&self, credential_id: &str) -> Vec<String> {
        self.storage().presentations(credential_id)
    }

    /// Number of active credentials.
    pub fn count(&self) -> usize {
        self.storage().count_credentials()
    }

    /// Overwrites a claim in place, bypassing signing.
    #[cfg(test)]
    pub(crate) fn corrupt_claim(&self, credential_id: &str, claim: &str, value: &str) {
        if let Some(issued) = self.storage().get_credential_mut(credential_id) {
            issued
                .credential
                .credential_subject
                .claims
                .insert(claim.to_string(), value.to_string());
        }
    }

    /// Overwrites the stored signature or key, bypassing signing.
    #[cfg(test)]
    pub(crate) fn corrupt_record(&self, credential_id: &str, signature: Option<Vec<u8>>, key: Option<&str>) {
        if let Some(issued) = self.storage().get_credential_mut(credential_id) {
            if let Some(signature) = signature {
                issued.signature = signature;
            }
            if let Some(key) = key {
                issued.public_key = key.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> BTreeMap<String, String> {
        let mut claims = BTreeMap::new();
        claims.insert("country".to_string(), "Wonderland".to_string());
        claims.insert("valid_date".to_string(), "2030-01-01".to_string());
        claims
    }

    #[test]
    fn test_issue_then_verify() {
        let engine = CredentialEngine::new();
        let issued = engine.issue("alice", "bob", claims()).unwrap();

        assert_eq!(issued.issuer_id(), "alice");
        assert_eq!(issued.subject_id(), "bob");
        assert_eq!(issued.credential.credential_subject.claims["country"], "Wonderland");
        assert!(issued.credential.issuance_date.ends_with('Z'));
        assert!(engine.verify(&issued.credential_id));
        assert_eq!(engine.count(), 1);
    }

    #[test]
    fn test_each_credential_gets_its_own_key() {
        let engine = CredentialEngine::new();
        let first = engine.issue("alice", "bob", claims()).unwrap();
        let second = engine.issue("alice", "bob", claims()).unwrap();

        assert_ne!(first.credential_id, second.credential_id);
        assert_ne!(first.public_key, second.public_key);
    }

    #[test]
    fn test_issue_rejects_missing_fields() {
        let engine = CredentialEngine::new();
        assert!(matches!(engine.issue("", "bob", claims()), Err(DidError::InvalidInput(_))));
        assert!(matches!(engine.issue("alice", " ", claims()), Err(DidError::InvalidInput(_))));
        assert!(matches!(
            engine.issue("alice", "bob", BTreeMap::new()),
            Err(DidError::InvalidInput(_))
        ));

        let mut shadowing = claims();
        shadowing.insert("id".into(), "mallory".into());
        assert!(matches!(engine.issue("alice", "bob", shadowing), Err(DidError::InvalidInput(_))));
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn test_tampered_claim_fails_verification() {
        let engine = CredentialEngine::new();
        let issued = engine.issue("alice", "bob", claims()).unwrap();

        engine.corrupt_claim(&issued.credential_id, "country", "Looking-Glass");

        assert_eq!(
            engine.check(&issued.credential_id),
            Err(VerificationError::SignatureMismatch)
        );
        assert!(!engine.verify(&issued.credential_id));
    }

    #[test]
    fn test_corrupted_signature_or_key_fails_closed() {
        let engine = CredentialEngine::new();
        let a = engine.issue("alice", "bob", claims()).unwrap();
        let b = engine.issue("alice", "bob", claims()).unwrap();

        engine.corrupt_record(&a.credential_id, Some(vec![1, 2, 3]), None);
        assert_eq!(engine.check(&a.credential_id), Err(VerificationError::MalformedSignature));

        engine.corrupt_record(&b.credential_id, None, Some("-----BEGIN PUBLIC KEY-----\n"));
        assert_eq!(engine.check(&b.credential_id), Err(VerificationError::InvalidPublicKey));
        assert!(!engine.verify(&b.credential_id));
    }

    #[test]
    fn test_unknown_credential_is_distinguished_internally() {
        let engine = CredentialEngine::new();
        assert_eq!(
            engine.check("nope"),
            Err(VerificationError::UnknownCredential("nope".into()))
        );
        assert!(!engine.verify("nope"));
    }

    #[test]
    fn test_revocation_is_final() {
        let engine = CredentialEngine::new();
        let issued = engine.issue("alice", "bob", claims()).unwrap();
        engine.present(&issued.credential_id, "v1").unwrap();

        assert!(engine.revoke(&issued.credential_id));
        assert!(!engine.verify(&issued.credential_id));
        assert!(engine.get(&issued.credential_id).is_none());
        assert!(engine.presented_to(&issued.credential_id).is_empty());

        assert!(!engine.revoke(&issued.credential_id));
        assert!(!engine.revoke("never-issued"));
        assert!(matches!(
            engine.present(&issued.credential_id, "v1"),
            Err(DidError::NotFound(_))
        ));
    }

    #[test]
    fn test_failed_audit_leaves_state_untouched() {
        let engine = CredentialEngine::new();
        let issued = engine.issue("alice", "bob", claims()).unwrap();
        engine.present(&issued.credential_id, "v1").unwrap();

        let refused = || Err(DidError::Signing("ledger unavailable".into()));
        assert!(matches!(
            engine.revoke_access_audited(&issued.credential_id, "v1", refused),
            Err(DidError::Signing(_))
        ));
        assert_eq!(engine.presented_to(&issued.credential_id), vec!["v1"]);

        assert!(matches!(
            engine.revoke_audited(&issued.credential_id, refused),
            Err(DidError::Signing(_))
        ));
        assert!(engine.verify(&issued.credential_id));

        let mut audited = false;
        assert!(matches!(
            engine.revoke_audited(&issued.credential_id, || {
                audited = true;
                Ok(())
            }),
            Ok(true)
        ));
        assert!(audited);
        assert!(engine.get(&issued.credential_id).is_none());

        // Unknown ids never reach the audit.
        assert!(matches!(
            engine.revoke_audited(&issued.credential_id, || panic!("audited a missing credential")),
            Ok(false)
        ));
    }

    #[test]
    fn test_present_is_idempotent() {
        let engine = CredentialEngine::new();
        let issued = engine.issue("alice", "bob", claims()).unwrap();

        engine.present(&issued.credential_id, "v1").unwrap();
        engine.present(&issued.credential_id, "v1").unwrap();

        assert_eq!(engine.presented_to(&issued.credential_id), vec!["v1"]);
    }

    #[test]
    fn test_revoke_access_removes_only_that_verifier() {
        let engine = CredentialEngine::new();
        let issued = engine.issue("alice", "bob", claims()).unwrap();
        engine.present(&issued.credential_id, "v1").unwrap();
        engine.present(&issued.credential_id, "v2").unwrap();

        engine.revoke_access(&issued.credential_id, "v1").unwrap();
        assert_eq!(engine.presented_to(&issued.credential_id), vec!["v2"]);

        assert!(matches!(
            engine.revoke_access(&issued.credential_id, "v1"),
            Err(DidError::NotFound(_))
        ));
        assert!(matches!(
            engine.revoke_access(&issued.credential_id, "never-granted"),
            Err(DidError::NotFound(_))
        ));
        // Presentation state does not affect the signature.
        assert!(engine.verify(&issued.credential_id));
    }
}
