// src/models/presentation.rs
//! Verifiable Presentation data model.
//!
//! A presentation wraps one or more credential JWTs, in order, under the
//! holder's own signature.

use serde::{Deserialize, Serialize};

use crate::models::credential::CREDENTIALS_CONTEXT;

pub const VERIFIABLE_PRESENTATION_TYPE: &str = "VerifiablePresentation";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiablePresentation {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// DID of the presenting holder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,

    /// Embedded VC-JWTs in presentation order
    #[serde(default)]
    pub verifiable_credential: Vec<String>,
}

impl VerifiablePresentation {
    pub fn new(id: Option<String>, holder: &str, credentials: Vec<String>) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id,
            types: vec![VERIFIABLE_PRESENTATION_TYPE.to_string()],
            holder: Some(holder.to_string()),
            verifiable_credential: credentials,
        }
    }
}

/// Claim set of a VP-JWT.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VpClaims {
    /// Holder DID
    pub iss: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    pub vp: VerifiablePresentation,
}
