// src/error.rs
//! Error taxonomy for the credential trust pipeline.
//!
//! Every fallible boundary returns one of these types. Soft rejection of an
//! empty or sentinel presentation is not an error value; see
//! [`crate::services::verifier::PresentationCheck`].

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure to decode or use public key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid multibase encoding: {0}")]
    Multibase(#[from] multibase::Error),

    #[error("public key must be base58btc multibase, got {0:?}")]
    UnexpectedBase(multibase::Base),

    #[error("invalid secp256k1 public key: {0}")]
    InvalidPublicKey(#[from] k256::ecdsa::Error),
}

/// Failure to parse a DID or locate key material for it.
#[derive(Debug, Error)]
pub enum DidError {
    #[error("invalid DID `{0}`")]
    InvalidDid(String),

    #[error("verification method `{0}` is not listed in the DID Document")]
    UnknownVerificationMethod(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Failure talking to the DID registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("DID `{0}` is not registered")]
    NotFound(String),

    #[error("registry rejected the request with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid registry URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("registry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed DID Document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Reasons a single JWT (VP or VC) fails parsing or verification.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unsupported signing algorithm `{0}`")]
    UnsupportedAlgorithm(String),

    #[error("token header carries no `kid`")]
    MissingKeyId,

    #[error("cannot resolve signing key: {0}")]
    Resolution(#[from] DidError),

    #[error("signature does not verify")]
    BadSignature,

    #[error("token signed by `{signer}` but claims issuer `{issuer}`")]
    SignerMismatch { signer: String, issuer: String },

    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("token not valid before {0}")]
    NotYetValid(DateTime<Utc>),

    #[error("signing failed: {0}")]
    Signing(k256::ecdsa::Error),
}

impl From<base64::DecodeError> for ProofError {
    fn from(err: base64::DecodeError) -> Self {
        ProofError::Malformed(format!("base64url: {}", err))
    }
}

impl From<serde_json::Error> for ProofError {
    fn from(err: serde_json::Error) -> Self {
        ProofError::Malformed(format!("json: {}", err))
    }
}

/// Which JWT of a presentation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The outer presentation token.
    Vp,
    /// The embedded credential at `index` (presentation order).
    Vc { index: usize },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Vp => "vp",
            Stage::Vc { .. } => "vc",
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Stage::Vp => None,
            Stage::Vc { index } => Some(*index),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vp => write!(f, "VP"),
            Stage::Vc { index } => write!(f, "VC #{}", index),
        }
    }
}

/// Hard failure of the presentation verification pipeline.
#[derive(Debug, Error)]
#[error("{stage} is invalid: {cause}")]
pub struct VerificationFailure {
    pub stage: Stage,
    #[source]
    pub cause: ProofError,
}

impl VerificationFailure {
    pub fn vp(cause: ProofError) -> Self {
        Self { stage: Stage::Vp, cause }
    }

    pub fn vc(index: usize, cause: ProofError) -> Self {
        Self { stage: Stage::Vc { index }, cause }
    }
}

/// Failure to assemble or sign a credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed creation VC: {0}")]
    Construction(String),

    #[error("failed signing VC: {0}")]
    Signing(#[source] ProofError),

    #[error("cannot load credential subject from {path}: {reason}")]
    SubjectSource { path: PathBuf, reason: String },
}

/// Request-level failure of the issuance flow.
#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error(transparent)]
    Verification(#[from] VerificationFailure),

    #[error("no presented credential satisfies the issuance policy")]
    PolicyNoMatch,

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl IssuanceError {
    /// Short machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            IssuanceError::Verification(_) => "verification_failure",
            IssuanceError::PolicyNoMatch => "policy_no_match",
            IssuanceError::Credential(_) => "credential_error",
        }
    }
}
