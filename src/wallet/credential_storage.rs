// src/wallet/credential_storage.rs
//! Credential storage and presentation for a holder wallet.
//!
//! Keeps received VC-JWTs in memory, keyed by credential id, and wraps a
//! selection of them into a VP-JWT signed with the holder's own key.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use log::debug;

use crate::error::{DidError, ProofError, RegistryError};
use crate::models::credential::VcClaims;
use crate::models::did::{Did, DidDocument, PRIMARY_KEY_FRAGMENT};
use crate::models::presentation::{VerifiablePresentation, VpClaims};
use crate::registry::DidRegistry;
use crate::utils::jwt::{decode, encode_sign};
use crate::wallet::key_management::KeyManager;

/// In-memory storage for credential JWTs.
///
/// Insertion order is not kept; ids are iterated in sorted order so
/// presentations built from "all credentials" are deterministic.
#[derive(Debug, Default, Clone)]
pub struct CredentialStorage {
    credentials: BTreeMap<String, String>,
}

impl CredentialStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a credential JWT, overwriting any credential with the same id.
    pub fn store_credential(&mut self, id: String, token: String) {
        self.credentials.insert(id, token);
    }

    pub fn get_credential(&self, id: &str) -> Option<&str> {
        self.credentials.get(id).map(String::as_str)
    }

    pub fn count_credentials(&self) -> usize {
        self.credentials.len()
    }

    pub fn contains_credential(&self, id: &str) -> bool {
        self.credentials.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.credentials.keys().map(String::as_str)
    }
}

/// A credential holder: own DID, key, and stored credentials.
#[derive(Debug, Clone)]
pub struct HolderWallet {
    keys: KeyManager,
    did: Did,
    document: DidDocument,
    storage: CredentialStorage,
    validity: Duration,
}

impl HolderWallet {
    /// Creates a holder with fresh keys under DID method `method`.
    pub fn generate(method: &str) -> Result<Self, DidError> {
        let keys = KeyManager::generate();
        let did = Did::new(method, &keys.public_key_base58())?;
        let document = DidDocument::with_primary_key(&did, keys.public_key_multibase());

        Ok(Self {
            keys,
            did,
            document,
            storage: CredentialStorage::new(),
            validity: Duration::minutes(5),
        })
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn document(&self) -> &DidDocument {
        &self.document
    }

    pub fn storage(&self) -> &CredentialStorage {
        &self.storage
    }

    /// Publishes the holder's DID Document so verifiers can check its VPs.
    pub async fn register(&self, registry: &dyn DidRegistry) -> Result<(), RegistryError> {
        registry
            .register_did(&self.did.to_string(), &self.document.to_json()?)
            .await
    }

    /// Stores a received credential JWT under its `jti` (or `vc.id`).
    ///
    /// The token is only decoded, not verified; returns the id used.
    pub fn receive(&mut self, token: &str) -> Result<String, ProofError> {
        let claims = decode::<VcClaims>(token)?.claims;
        let id = claims.jti.unwrap_or(claims.vc.id);
        if self.storage.contains_credential(&id) {
            debug!("replacing stored credential {}", id);
        }
        self.storage.store_credential(id.clone(), token.to_string());
        Ok(id)
    }

    /// Stores an arbitrary token under `id` without decoding it.
    pub fn store_raw(&mut self, id: &str, token: &str) {
        self.storage.store_credential(id.to_string(), token.to_string());
    }

    /// Signs a VP-JWT over raw credential tokens, in the given order.
    pub fn sign_presentation(&self, credentials: Vec<String>) -> Result<String, ProofError> {
        let holder = self.did.to_string();
        let now = Utc::now();
        let claims = VpClaims {
            iss: holder.clone(),
            jti: None,
            iat: Some(now.timestamp()),
            nbf: Some(now.timestamp()),
            exp: Some((now + self.validity).timestamp()),
            nonce: None,
            vp: VerifiablePresentation::new(None, &holder, credentials),
        };
        debug!("{} presents {} credential(s)", holder, claims.vp.verifiable_credential.len());
        encode_sign(&claims, &self.did.key_id(PRIMARY_KEY_FRAGMENT), &self.keys)
    }

    /// Presents the stored credentials named by `ids`, in that order.
    /// Unknown ids are skipped.
    pub fn present(&self, ids: &[&str]) -> Result<String, ProofError> {
        let credentials = ids
            .iter()
            .filter_map(|id| self.storage.get_credential(id))
            .map(str::to_string)
            .collect();
        self.sign_presentation(credentials)
    }

    /// Presents every stored credential, ordered by id.
    pub fn present_all(&self) -> Result<String, ProofError> {
        let ids: Vec<&str> = self.storage.ids().collect();
        self.present(&ids)
    }
}
