// src/wallet/credential_storage.rs
//! Credential table for the credential engine.
//!
//! Holds every active credential keyed by its id, together with the set of
//! verifiers each one has been presented to. A credential and its
//! presentation set are inserted and removed together.

use crate::models::credential::IssuedCredential;
use std::collections::{BTreeSet, HashMap};

/// In-memory storage for issued credentials and their presentation sets.
///
/// Not synchronized; the engine wraps it in a single mutex so a credential
/// and its presentation set are always updated atomically.
#[derive(Default)]
pub struct CredentialStorage {
    /// Active credentials by credential id
    credentials: HashMap<String, IssuedCredential>,
    /// Verifier ids each credential has been disclosed to
    presentations: HashMap<String, BTreeSet<String>>,
}

impl CredentialStorage {
    /// Creates a new empty CredentialStorage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an issued credential under its own id.
    ///
    /// Overwrites an existing credential with the same id.
    pub fn store_credential(&mut self, credential: IssuedCredential) {
        self.credentials
            .insert(credential.credential_id.clone(), credential);
    }

    /// Retrieves an active credential by its ID.
    pub fn get_credential(&self, id: &str) -> Option<&IssuedCredential> {
        self.credentials.get(id)
    }

    /// Mutable access, used to simulate corruption of stored records.
    #[cfg(test)]
    pub fn get_credential_mut(&mut self, id: &str) -> Option<&mut IssuedCredential> {
        self.credentials.get_mut(id)
    }

    /// Returns the number of active credentials.
    pub fn count_credentials(&self) -> usize {
        self.credentials.len()
    }

    pub fn contains_credential(&self, id: &str) -> bool {
        self.credentials.contains_key(id)
    }

    /// Removes a credential and its presentation set.
    ///
    /// # Returns
    /// `true` if the credential was present and removed, `false` otherwise.
    pub fn remove_credential(&mut self, id: &str) -> bool {
        self.presentations.remove(id);
        self.credentials.remove(id).is_some()
    }

    /// Adds `verifier_id` to the presentation set of an active credential.
    ///
    /// # Returns
    /// `false` if the credential is not stored. Re-adding a verifier is a
    /// no-op that still returns `true`.
    pub fn add_presentation(&mut self, id: &str, verifier_id: &str) -> bool {
        if !self.credentials.contains_key(id) {
            return false;
        }
        self.presentations
            .entry(id.to_string())
            .or_default()
            .insert(verifier_id.to_string());
        true
    }

    pub fn has_presentation(&self, id: &str, verifier_id: &str) -> bool {
        self.presentations
            .get(id)
            .map_or(false, |verifiers| verifiers.contains(verifier_id))
    }

    /// Removes `verifier_id` from a credential's presentation set.
    ///
    /// # Returns
    /// `true` only if the verifier had been granted presentation.
    pub fn remove_presentation(&mut self, id: &str, verifier_id: &str) -> bool {
        match self.presentations.get_mut(id) {
            Some(verifiers) => verifiers.remove(verifier_id),
            None => false,
        }
    }

    /// Verifiers a credential has been presented to, in sorted order.
    pub fn presentations(&self, id: &str) -> Vec<String> {
        self.presentations
            .get(id)
            .map(|verifiers| verifiers.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::VerifiableCredential;
    use std::collections::BTreeMap;

    fn create_test_credential(id: &str) -> IssuedCredential {
        IssuedCredential {
            credential_id: id.to_string(),
            credential: VerifiableCredential::new(
                "issuer".into(),
                "holder".into(),
                BTreeMap::new(),
                "2024-01-01T00:00:00Z".into(),
            ),
            signature: Vec::new(),
            public_key: String::new(),
        }
    }

    #[test]
    fn test_contains_credential() {
        let mut storage = CredentialStorage::new();
        let credential_id = "education-degree-123";

        assert!(!storage.contains_credential(credential_id));

        storage.store_credential(create_test_credential(credential_id));
        assert!(storage.contains_credential(credential_id));
    }

    #[test]
    fn test_remove_credential_drops_presentations() {
        let mut storage = CredentialStorage::new();
        let credential_id = "temporary-access-pass";

        storage.store_credential(create_test_credential(credential_id));
        assert!(storage.add_presentation(credential_id, "verifier-1"));

        assert!(storage.remove_credential(credential_id));
        assert!(!storage.contains_credential(credential_id));
        assert!(storage.presentations(credential_id).is_empty());
        assert_eq!(storage.count_credentials(), 0);

        assert!(!storage.remove_credential("non-existent-id"));
    }

    #[test]
    fn test_presentation_requires_stored_credential() {
        let mut storage = CredentialStorage::new();
        assert!(!storage.add_presentation("missing", "verifier-1"));
        assert!(storage.presentations("missing").is_empty());
    }

    #[test]
    fn test_presentation_set_semantics() {
        let mut storage = CredentialStorage::new();
        storage.store_credential(create_test_credential("membership-card"));

        storage.add_presentation("membership-card", "v2");
        storage.add_presentation("membership-card", "v1");
        storage.add_presentation("membership-card", "v2");
        assert_eq!(storage.presentations("membership-card"), vec!["v1", "v2"]);

        assert!(storage.remove_presentation("membership-card", "v2"));
        assert!(!storage.remove_presentation("membership-card", "v2"));
        assert_eq!(storage.presentations("membership-card"), vec!["v1"]);
    }

    #[test]
    fn test_count_after_operations() {
        let mut storage = CredentialStorage::new();

        storage.store_credential(create_test_credential("id1"));
        storage.store_credential(create_test_credential("id2"));
        assert_eq!(storage.count_credentials(), 2);

        storage.remove_credential("id1");
        assert_eq!(storage.count_credentials(), 1);

        storage.store_credential(create_test_credential("id2"));
        assert_eq!(storage.count_credentials(), 1);
    }
}
