// src/registry/did_registry.rs
//! DID registry interface implementation.
//!
//! Provides an abstraction over wherever DID Documents are published:
//! - [`InMemoryDidRegistry`] for local runs and tests
//! - [`HttpDidRegistry`] for a remote registrar reachable over HTTP
//!
//! Both store the serialized document keyed by the DID string.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use log::debug;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::{DidError, RegistryError};
use crate::models::did::{Did, DidDocument};
use crate::utils::crypto::decode_public_key_multibase;
use crate::utils::serialization::deserialize;

/// Publication and lookup of DID Documents.
#[async_trait]
pub trait DidRegistry: Send + Sync {
    /// Publishes the serialized document for `did`.
    async fn register_did(&self, did: &str, document: &str) -> Result<(), RegistryError>;

    /// Fetches the current document for `did`.
    async fn resolve_did(&self, did: &str) -> Result<DidDocument, RegistryError>;
}

/// Resolves a verification method id (`<did>#<fragment>`) to its public key.
///
/// # Errors
/// - [`DidError::InvalidDid`] if the DID part does not parse
/// - [`DidError::Registry`] if the document cannot be fetched
/// - [`DidError::UnknownVerificationMethod`] if the document lacks `kid`
/// - [`DidError::Key`] if the published key does not decode
pub async fn resolve_verification_key(
    registry: &dyn DidRegistry,
    kid: &str,
) -> Result<VerifyingKey, DidError> {
    let did = Did::from_did_url(kid)?;
    let document = registry.resolve_did(&did.to_string()).await?;
    let method = document
        .verification_method(kid)
        .ok_or_else(|| DidError::UnknownVerificationMethod(kid.to_string()))?;
    Ok(decode_public_key_multibase(&method.public_key_multibase)?)
}

/// In-memory registry.
///
/// Later registrations of the same DID overwrite earlier ones.
#[derive(Default)]
pub struct InMemoryDidRegistry {
    documents: RwLock<HashMap<String, String>>,
}

impl InMemoryDidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or_default()
    }
}

#[async_trait]
impl DidRegistry for InMemoryDidRegistry {
    async fn register_did(&self, did: &str, document: &str) -> Result<(), RegistryError> {
        // Reject documents that would fail resolution later.
        deserialize::<DidDocument>(document)?;
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        documents.insert(did.to_string(), document.to_string());
        debug!("registered {} in memory", did);
        Ok(())
    }

    async fn resolve_did(&self, did: &str) -> Result<DidDocument, RegistryError> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let document = documents
            .get(did)
            .ok_or_else(|| RegistryError::NotFound(did.to_string()))?;
        Ok(deserialize(document)?)
    }
}

/// Request body for registering a DID with a remote registrar
#[derive(Serialize, Deserialize)]
struct RegisterDidRequest<'a> {
    did: &'a str,
    document: &'a str,
}

/// HTTP client for a remote DID registrar.
///
/// # Endpoints
/// - `POST {base_url}/dids` with `{"did": .., "document": <serialized>}`
/// - `GET  {base_url}/dids/{did}` returning the DID Document
///
/// The DID is always sent as one percent-encoded path segment.
#[derive(Clone)]
pub struct HttpDidRegistry {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDidRegistry {
    /// # Errors
    /// [`RegistryError::InvalidUrl`] unless `base_url` is an absolute
    /// `http(s)` URL that can carry a path.
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) base URL".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: parsed,
        })
    }

    /// `base_url` with `segments` appended, each percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RegistryError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".into(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn status_error(response: reqwest::Response) -> RegistryError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        RegistryError::Status { status, body }
    }
}

#[async_trait]
impl DidRegistry for HttpDidRegistry {
    async fn register_did(&self, did: &str, document: &str) -> Result<(), RegistryError> {
        let response = self
            .client
            .post(self.endpoint(&["dids"])?)
            .json(&RegisterDidRequest { did, document })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        debug!("registered {} at {}", did, self.base_url);
        Ok(())
    }

    async fn resolve_did(&self, did: &str) -> Result<DidDocument, RegistryError> {
        let response = self
            .client
            .get(self.endpoint(&["dids", did])?)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(did.to_string())),
            status if status.is_success() => {
                let text = response.text().await?;
                Ok(deserialize(&text)?)
            }
            _ => Err(Self::status_error(response).await),
        }
    }
}
