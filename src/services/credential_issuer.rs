// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Assembles the university diploma credential and signs it as a JWT with the
//! issuer's private key. The credential subject comes either from a built-in
//! default or from a JSON document on disk.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use log::{debug, info};
use serde_json::Value;

use crate::error::CredentialError;
use crate::models::credential::{CredentialSubject, VcClaims, VerifiableCredential};
use crate::services::identity::IssuerIdentity;
use crate::utils::jwt::encode_sign;
use crate::utils::serialization::load_json_object;

/// Fixed identifier of the issued diploma credential.
pub const DIPLOMA_CREDENTIAL_ID: &str = "1234567890";

/// Type tags of the issued diploma credential.
pub const DIPLOMA_CREDENTIAL_TYPES: [&str; 2] = ["VerifiableCredential", "DiplomaOfUniversity"];

/// Subject used when no JSON source is configured.
pub const DEFAULT_SUBJECT_NAME: &str = "HONG KIL DONG";

/// Where the issued credential's subject claims come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectSource {
    /// `{"name": "HONG KIL DONG"}`
    Default,
    /// A JSON object on disk mapping claim names to values.
    JsonFile(PathBuf),
}

impl SubjectSource {
    /// Produces the subject claims.
    ///
    /// # Errors
    /// [`CredentialError::SubjectSource`] if the file cannot be loaded.
    pub fn load(&self) -> Result<CredentialSubject, CredentialError> {
        match self {
            SubjectSource::Default => {
                let mut subject = CredentialSubject::new();
                subject.insert("name".into(), Value::from(DEFAULT_SUBJECT_NAME));
                Ok(subject)
            }
            SubjectSource::JsonFile(path) => load_json_object(path),
        }
    }
}

impl From<Option<PathBuf>> for SubjectSource {
    fn from(path: Option<PathBuf>) -> Self {
        path.map_or(SubjectSource::Default, SubjectSource::JsonFile)
    }
}

/// Builds and signs diploma credentials for one issuer identity.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    /// Optional lifetime of issued tokens (`exp = iat + validity`)
    validity: Option<Duration>,
}

impl CredentialIssuer {
    pub fn new(validity: Option<Duration>) -> Self {
        Self { validity }
    }

    /// Issues a signed diploma VC-JWT over `subject`.
    ///
    /// # Returns
    /// Compact JWT whose header `kid` is the issuer's first verification
    /// method id.
    ///
    /// # Errors
    /// - [`CredentialError::Construction`] if the credential cannot be assembled,
    ///   including an expiry past the representable date range
    /// - [`CredentialError::Signing`] if signing fails; no empty token is ever returned
    pub fn issue_credential(
        &self,
        identity: &IssuerIdentity,
        subject: CredentialSubject,
    ) -> Result<String, CredentialError> {
        let kid = identity.signing_key_id();
        if kid.is_empty() {
            return Err(CredentialError::Construction(
                "issuer DID Document has no verification method".into(),
            ));
        }

        let issuer_did = identity.did().to_string();
        let now = Utc::now();

        let vc = VerifiableCredential::new(
            DIPLOMA_CREDENTIAL_ID,
            &DIPLOMA_CREDENTIAL_TYPES,
            &issuer_did,
            subject,
        )?
        .with_issuance_date(now);

        let exp = match self.validity {
            Some(validity) => {
                let expiry = now.checked_add_signed(validity).ok_or_else(|| {
                    CredentialError::Construction(format!(
                        "credential validity of {}s is out of range",
                        validity.num_seconds()
                    ))
                })?;
                Some(expiry.timestamp())
            }
            None => None,
        };

        let claims = VcClaims {
            iss: issuer_did,
            jti: Some(vc.id.clone()),
            iat: Some(now.timestamp()),
            nbf: Some(now.timestamp()),
            exp,
            vc,
        };

        let token =
            encode_sign(&claims, kid, identity.keys()).map_err(CredentialError::Signing)?;
        debug!("signed VC {} with {}", DIPLOMA_CREDENTIAL_ID, kid);
        info!("issued {} {}", DIPLOMA_CREDENTIAL_TYPES[1], DIPLOMA_CREDENTIAL_ID);
        Ok(token)
    }

    /// Loads the subject from `source` and issues the credential.
    pub fn issue_from_source(
        &self,
        identity: &IssuerIdentity,
        source: &SubjectSource,
    ) -> Result<String, CredentialError> {
        let subject = source.load()?;
        self.issue_credential(identity, subject)
    }
}

impl Default for CredentialIssuer {
    fn default() -> Self {
        Self::new(None)
    }
}
