// src/services/identity.rs
//! Issuer key and DID provisioning.
//!
//! An [`IssuerIdentity`] is an immutable value: keypair, DID and DID Document
//! created together. Requests read it through [`SharedIdentity`], which hands
//! out `Arc` snapshots and swaps in a whole new identity on re-provisioning.

use std::sync::{Arc, RwLock};

use log::{error, info};

use crate::error::{DidError, RegistryError};
use crate::models::did::{Did, DidDocument};
use crate::registry::DidRegistry;
use crate::wallet::key_management::KeyManager;

/// Default DID method of provisioned issuers.
pub const DEFAULT_DID_METHOD: &str = "ssikr";

/// Keys, DID and DID Document of one issuer lifetime.
#[derive(Debug, Clone)]
pub struct IssuerIdentity {
    keys: KeyManager,
    did: Did,
    document: DidDocument,
}

impl IssuerIdentity {
    /// Generates fresh keys and derives the DID and its DID Document.
    ///
    /// Every call yields an unrelated identity.
    ///
    /// # Errors
    /// [`DidError::InvalidDid`] if `method` is not a valid DID method name.
    pub fn generate(method: &str) -> Result<Self, DidError> {
        let keys = KeyManager::generate();
        let did = Did::new(method, &keys.public_key_base58())?;

        let document = DidDocument::with_primary_key(&did, keys.public_key_multibase());

        Ok(Self {
            keys,
            did,
            document,
        })
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn document(&self) -> &DidDocument {
        &self.document
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    /// Id of the key used to sign credentials: the first verification method.
    pub fn signing_key_id(&self) -> &str {
        self.document
            .verification_method
            .first()
            .map(|vm| vm.id.as_str())
            .unwrap_or_default()
    }

    /// Publishes `(did, serialized document)` to the registry.
    pub async fn register(&self, registry: &dyn DidRegistry) -> Result<(), RegistryError> {
        let document = self.document.to_json()?;
        registry.register_did(&self.did.to_string(), &document).await
    }
}

/// Generates an identity and publishes it.
///
/// The identity is returned even when publication fails; retrying the
/// registration is up to the caller.
pub async fn provision(
    method: &str,
    registry: &dyn DidRegistry,
) -> Result<(IssuerIdentity, Result<(), RegistryError>), DidError> {
    let identity = IssuerIdentity::generate(method)?;
    let registration = identity.register(registry).await;
    match &registration {
        Ok(()) => info!("provisioned issuer {}", identity.did()),
        Err(e) => error!("provisioned issuer {} but registration failed: {}", identity.did(), e),
    }
    Ok((identity, registration))
}

/// Read-mostly handle to the current issuer identity.
#[derive(Clone)]
pub struct SharedIdentity {
    current: Arc<RwLock<Arc<IssuerIdentity>>>,
}

impl SharedIdentity {
    pub fn new(identity: IssuerIdentity) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(identity))),
        }
    }

    /// Consistent snapshot for the duration of one request.
    pub fn snapshot(&self) -> Arc<IssuerIdentity> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Atomically installs a new identity, returning the previous one.
    pub fn replace(&self, identity: IssuerIdentity) -> Arc<IssuerIdentity> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(identity))
    }

    /// Provisions a new identity and swaps it in once it is generated.
    ///
    /// Snapshots taken before the swap keep the previous identity.
    pub async fn reprovision(
        &self,
        method: &str,
        registry: &dyn DidRegistry,
    ) -> Result<Result<(), RegistryError>, DidError> {
        let (identity, registration) = provision(method, registry).await?;
        self.replace(identity);
        Ok(registration)
    }
}
