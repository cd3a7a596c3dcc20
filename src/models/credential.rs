// src/models/credential.rs
//! Verifiable Credential data model implementation.
//!
//! Defines the W3C-shaped Verifiable Credential and the JWT claim set that
//! carries it, following the
//! [VC Data Model JWT encoding](https://www.w3.org/TR/vc-data-model/#json-web-token).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CredentialError;
use crate::models::did::Did;

/// Base JSON-LD context for credentials and presentations.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Type tag that must lead every credential's type list.
pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";

/// Claim name to claim value. No schema is enforced.
pub type CredentialSubject = Map<String, Value>;

/// A Verifiable Credential according to W3C standards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Credential identifier
    /// Example: "1234567890"
    pub id: String,

    /// Ordered type tags, `"VerifiableCredential"` first
    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// DID of the credential issuer
    pub issuer: String,

    /// RFC 3339 issuance timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<String>,

    /// Claims about the subject
    pub credential_subject: CredentialSubject,
}

impl VerifiableCredential {
    /// Assembles an unsigned credential.
    ///
    /// # Errors
    /// [`CredentialError::Construction`] if the id is empty, the type list does
    /// not start with `"VerifiableCredential"`, or the issuer is not a DID.
    pub fn new(
        id: &str,
        types: &[&str],
        issuer: &str,
        credential_subject: CredentialSubject,
    ) -> Result<Self, CredentialError> {
        if id.trim().is_empty() {
            return Err(CredentialError::Construction("credential id is empty".into()));
        }
        if types.first() != Some(&VERIFIABLE_CREDENTIAL_TYPE) {
            return Err(CredentialError::Construction(format!(
                "type list must start with `{}`",
                VERIFIABLE_CREDENTIAL_TYPE
            )));
        }
        issuer
            .parse::<Did>()
            .map_err(|e| CredentialError::Construction(e.to_string()))?;

        Ok(Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: id.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
            issuer: issuer.to_string(),
            issuance_date: None,
            credential_subject,
        })
    }

    pub fn with_issuance_date(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issuance_date = Some(issued_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        self
    }
}

/// Claim set of a VC-JWT.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VcClaims {
    /// Issuer DID
    pub iss: String,

    /// Credential id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    pub vc: VerifiableCredential,
}

impl VcClaims {
    pub fn credential_subject(&self) -> &CredentialSubject {
        &self.vc.credential_subject
    }
}
