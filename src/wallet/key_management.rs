// src/wallet/key_management.rs
//! Cryptographic key management for issuers and holders.
//!
//! Provides generation and usage of the secp256k1 keys that back a DID:
//! - ECDSA signatures over SHA-256 (JWS `ES256K`)
//! - Public key encodings for DIDs and DID Documents
//! - Cryptographically secure random key generation

use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::ProofError;
use crate::utils::crypto::{public_key_base58, public_key_multibase};

/// Key management for elliptic curve cryptography.
///
/// This struct provides:
/// - Fresh key generation using the OS RNG
/// - Public key derivation and encoding
/// - Message signing
///
/// The secret key is never exposed; clones share nothing mutable.
#[derive(Clone)]
pub struct KeyManager {
    /// Private signing key (never exposed)
    signing_key: SigningKey,
    /// Derived public key for verification
    verifying_key: VerifyingKey,
}

impl KeyManager {
    /// Generates a new KeyManager with a fresh secp256k1 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();
        KeyManager {
            signing_key,
            verifying_key,
        }
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Base58 of the compressed public key.
    pub fn public_key_base58(&self) -> String {
        public_key_base58(&self.verifying_key)
    }

    /// Base58btc multibase of the compressed public key.
    pub fn public_key_multibase(&self) -> String {
        public_key_multibase(&self.verifying_key)
    }

    /// Signs a message using ECDSA (secp256k1) with SHA-256 prehashing.
    ///
    /// # Returns
    /// 64-byte compact signature (R || S), S normalized low
    ///
    /// # Security
    /// - Uses deterministic ECDSA (RFC 6979)
    pub fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ProofError> {
        let signature: Signature = self
            .signing_key
            .try_sign(message)
            .map_err(ProofError::Signing)?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("public_key", &self.public_key_multibase())
            .finish_non_exhaustive()
    }
}
