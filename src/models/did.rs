// src/models/did.rs
//! Decentralized Identifier (DID) data model implementation.
//!
//! Defines the DID itself and the DID Document that binds it to verification
//! material, following the shape of the
//! [DID Core Specification](https://www.w3.org/TR/did-core/).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DidError;

/// JSON-LD context every DID Document carries.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Verification method type for secp256k1 keys.
pub const VERIFICATION_KEY_TYPE_SECP256K1: &str = "EcdsaSecp256k1VerificationKey2019";

/// Fragment of the single key every provisioned identity publishes.
pub const PRIMARY_KEY_FRAGMENT: &str = "keys-1";

/// A method-scoped decentralized identifier.
///
/// # DID Format
/// ```text
/// did:<method>:<method-specific-id>
/// ```
///
/// Immutable once created. Re-provisioning an issuer creates a new `Did`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    method: String,
    method_specific_id: String,
}

impl Did {
    /// Builds a DID from a method name and a method-specific identifier
    /// (for provisioned identities, the base58 public key).
    pub fn new(method: &str, method_specific_id: &str) -> Result<Self, DidError> {
        let valid_method = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !valid_method || !is_method_specific_id(method_specific_id) {
            return Err(DidError::InvalidDid(format!(
                "did:{}:{}",
                method, method_specific_id
            )));
        }

        Ok(Self {
            method: method.to_string(),
            method_specific_id: method_specific_id.to_string(),
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn method_specific_id(&self) -> &str {
        &self.method_specific_id
    }

    /// DID URL of a key fragment, e.g. `did:ssikr:abc#keys-1`.
    pub fn key_id(&self, fragment: &str) -> String {
        format!("{}#{}", self, fragment)
    }

    /// Splits a DID URL (`<did>#<fragment>`) and parses its DID part.
    pub fn from_did_url(did_url: &str) -> Result<Self, DidError> {
        let did = did_url.split('#').next().unwrap_or_default();
        did.parse()
    }
}

/// `idchar` segments separated by `:`, none of them empty, where `idchar` is
/// `ALPHA / DIGIT / "." / "-" / "_" / pct-encoded`.
fn is_method_specific_id(id: &str) -> bool {
    id.split(':').all(|segment| {
        let bytes = segment.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'%' => {
                    let escaped = bytes
                        .get(i + 1..i + 3)
                        .map_or(false, |hex| hex.iter().all(u8::is_ascii_hexdigit));
                    if !escaped {
                        return false;
                    }
                    i += 3;
                }
                b if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_') => i += 1,
                _ => return false,
            }
        }
        !bytes.is_empty()
    })
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:{}:{}", self.method, self.method_specific_id)
    }
}

impl FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("did"), Some(method), Some(id)) => {
                Did::new(method, id).map_err(|_| DidError::InvalidDid(s.to_string()))
            }
            _ => Err(DidError::InvalidDid(s.to_string())),
        }
    }
}

/// An entry of a DID Document binding a key id to a public key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// DID URL of the key, e.g. `did:ssikr:abc#keys-1`
    pub id: String,

    /// Cryptographic suite of the key
    #[serde(rename = "type")]
    pub key_type: String,

    /// DID that controls the key
    pub controller: String,

    /// Multibase (base58btc) encoding of the compressed public key
    pub public_key_multibase: String,
}

/// A DID Document representing a decentralized identity.
///
/// Created once at provisioning and published to the registry keyed by the
/// DID string. Never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// The complete DID string identifier
    pub id: String,

    pub verification_method: Vec<VerificationMethod>,
}

impl DidDocument {
    pub fn new(did: &str, verification_method: Vec<VerificationMethod>) -> Self {
        Self {
            context: vec![DID_CONTEXT.to_string()],
            id: did.to_string(),
            verification_method,
        }
    }

    /// Document with a single secp256k1 key at `#keys-1`, controlled by `did`.
    pub fn with_primary_key(did: &Did, public_key_multibase: String) -> Self {
        Self::new(
            &did.to_string(),
            vec![VerificationMethod {
                id: did.key_id(PRIMARY_KEY_FRAGMENT),
                key_type: VERIFICATION_KEY_TYPE_SECP256K1.to_string(),
                controller: did.to_string(),
                public_key_multibase,
            }],
        )
    }

    /// Looks up a verification method by its full DID URL.
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|vm| vm.id == id)
    }

    /// Serialized form published to the registry.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
