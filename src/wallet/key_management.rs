// src/wallet/key_management.rs
//! Cryptographic key management for credential signing.
//!
//! Every issued credential gets its own freshly generated signing key. The
//! private half is used once to sign and then dropped; only the public key
//! survives, stored as PEM next to the credential it verifies.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - ECDSA with SHA-256 and deterministic RFC 6979 nonces
//! - SubjectPublicKeyInfo PEM for key export
//! - Cryptographically secure random number generation

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use k256::{PublicKey, SecretKey};
use thiserror::Error;

/// Why a stored signature did not check out.
///
/// Kept internal to the credential engine; callers outside it only ever see
/// a boolean.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("unknown credential {0}")]
    UnknownCredential(String),

    #[error("signature bytes are malformed")]
    MalformedSignature,

    #[error("public key could not be parsed")]
    InvalidPublicKey,

    #[error("signature does not match credential body")]
    SignatureMismatch,

    #[error("credential body could not be canonicalized")]
    Canonicalization,
}

/// Single-use signing identity for one credential.
///
/// # Security Notes
/// - Secret keys are never exposed publicly
/// - The key is not linked to the issuer DID; see the credential model for
///   what a successful verification does and does not prove
pub struct KeyManager {
    /// Securely stored private key (never exposed)
    secret_key: SecretKey,
    /// Derived public key for verification
    pub public_key: PublicKey,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh secp256k1 keypair from the
    /// thread-local CSPRNG.
    pub fn generate() -> Self {
        let secret_key = SecretKey::random(&mut rand::thread_rng());
        let public_key = secret_key.public_key();
        KeyManager {
            secret_key,
            public_key,
        }
    }

    /// Signs a message using ECDSA (secp256k1) with SHA-256.
    ///
    /// # Returns
    /// 64-byte compact ECDSA signature (R || S values)
    pub fn sign_message(&self, message: &[u8]) -> Vec<u8> {
        let signing_key = SigningKey::from(&self.secret_key);
        let signature: Signature = signing_key.sign(message);
        signature.to_vec()
    }

    /// Exports the public key as SubjectPublicKeyInfo PEM.
    pub fn public_key_pem(&self) -> Result<String, k256::pkcs8::spki::Error> {
        self.public_key.to_public_key_pem(LineEnding::LF)
    }
}

/// Verifies `signature` over `message` against a PEM-encoded public key.
///
/// Each failure stage maps to its own [`VerificationError`] variant.
pub fn verify_signature(
    public_key_pem: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<(), VerificationError> {
    let public_key = PublicKey::from_public_key_pem(public_key_pem)
        .map_err(|_| VerificationError::InvalidPublicKey)?;
    let signature =
        Signature::from_slice(signature).map_err(|_| VerificationError::MalformedSignature)?;

    VerifyingKey::from(&public_key)
        .verify(message, &signature)
        .map_err(|_| VerificationError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let keys = KeyManager::generate();
        let pem = keys.public_key_pem().unwrap();
        let signature = keys.sign_message(b"credential body");

        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert_eq!(signature.len(), 64);
        assert_eq!(verify_signature(&pem, b"credential body", &signature), Ok(()));
    }

    #[test]
    fn test_signatures_are_deterministic() {
        let keys = KeyManager::generate();
        assert_eq!(keys.sign_message(b"same input"), keys.sign_message(b"same input"));
    }

    #[test]
    fn test_each_manager_has_its_own_key() {
        let a = KeyManager::generate();
        let b = KeyManager::generate();
        assert_ne!(a.public_key_pem().unwrap(), b.public_key_pem().unwrap());

        let signature = a.sign_message(b"msg");
        assert_eq!(
            verify_signature(&b.public_key_pem().unwrap(), b"msg", &signature),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn test_verification_failure_causes() {
        let keys = KeyManager::generate();
        let pem = keys.public_key_pem().unwrap();
        let signature = keys.sign_message(b"msg");

        assert_eq!(
            verify_signature(&pem, b"other msg", &signature),
            Err(VerificationError::SignatureMismatch)
        );
        assert_eq!(
            verify_signature(&pem, b"msg", &signature[..10]),
            Err(VerificationError::MalformedSignature)
        );
        assert_eq!(
            verify_signature("not a pem", b"msg", &signature),
            Err(VerificationError::InvalidPublicKey)
        );
    }
}
