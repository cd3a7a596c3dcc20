// src/utils/jwt.rs
//! Compact JWS / JWT codec for `ES256K` (ECDSA secp256k1 + SHA-256).
//!
//! Tokens have the form `base64url(header).base64url(claims).base64url(sig)`
//! where `sig` is the 64-byte `r || s` signature over the first two segments.
//! Decoding and signature verification are separate steps so the caller can
//! resolve the signer's key from the header `kid` in between.

use chrono::{DateTime, TimeZone, Utc};
use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature, VerifyingKey};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ProofError;
use crate::utils::serialization::{base64url_decode_json, base64url_encode, base64url_encode_json};
use crate::wallet::key_management::KeyManager;

pub const ALGORITHM_ES256K: &str = "ES256K";
pub const TOKEN_TYPE_JWT: &str = "JWT";

/// Protected header of a token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub alg: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Verification method id (DID URL) of the signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Header {
    pub fn es256k(kid: &str) -> Self {
        Self {
            alg: ALGORITHM_ES256K.to_string(),
            typ: Some(TOKEN_TYPE_JWT.to_string()),
            kid: Some(kid.to_string()),
        }
    }
}

/// A structurally valid token whose signature has not been checked yet.
#[derive(Debug, Clone)]
pub struct DecodedJwt<C> {
    pub header: Header,
    pub claims: C,
    signing_input: String,
    signature: Vec<u8>,
}

impl<C> DecodedJwt<C> {
    /// Signing key id from the header. Always present after [`decode`].
    pub fn key_id(&self) -> &str {
        self.header.kid.as_deref().unwrap_or_default()
    }

    /// Checks the signature against `key`.
    pub fn verify_signature(&self, key: &VerifyingKey) -> Result<(), ProofError> {
        let signature =
            Signature::from_slice(&self.signature).map_err(|_| ProofError::BadSignature)?;
        key.verify(self.signing_input.as_bytes(), &signature)
            .map_err(|_| ProofError::BadSignature)
    }
}

/// Signs `claims` as an `ES256K` JWT naming `kid` as the signing key.
pub fn encode_sign<C: Serialize>(
    claims: &C,
    kid: &str,
    keys: &KeyManager,
) -> Result<String, ProofError> {
    let header_b64 = base64url_encode_json(&Header::es256k(kid))?;
    let claims_b64 = base64url_encode_json(claims)?;
    let signing_input = header_b64 + "." + &claims_b64;
    let signature = keys.sign_message(signing_input.as_bytes())?;
    Ok(signing_input + "." + &base64url_encode(&signature))
}

/// Splits a compact token into its three segments.
pub fn split_jws(token: &str) -> Result<(&str, &str, &str), ProofError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
            Ok((h, p, s))
        }
        _ => Err(ProofError::Malformed(
            "expected three non-empty dot-separated segments".into(),
        )),
    }
}

/// Parses a token without verifying its signature.
///
/// # Errors
/// - [`ProofError::Malformed`] for bad segments, base64 or JSON
/// - [`ProofError::UnsupportedAlgorithm`] unless `alg` is `ES256K`
/// - [`ProofError::MissingKeyId`] if the header has no `kid`
pub fn decode<C: DeserializeOwned>(token: &str) -> Result<DecodedJwt<C>, ProofError> {
    let (header_b64, claims_b64, signature_b64) = split_jws(token)?;

    let header: Header = base64url_decode_json(header_b64)?;
    if header.alg != ALGORITHM_ES256K {
        return Err(ProofError::UnsupportedAlgorithm(header.alg));
    }
    if header.kid.as_deref().map_or(true, str::is_empty) {
        return Err(ProofError::MissingKeyId);
    }

    let claims: C = base64url_decode_json(claims_b64)?;
    let signature = base64::decode_config(signature_b64, base64::URL_SAFE_NO_PAD)?;

    Ok(DecodedJwt {
        header,
        claims,
        signing_input: format!("{}.{}", header_b64, claims_b64),
        signature,
    })
}

/// Parses a token and verifies it against a known key.
#[cfg(test)]
pub(crate) fn decode_verify<C: DeserializeOwned>(
    token: &str,
    key: &VerifyingKey,
) -> Result<DecodedJwt<C>, ProofError> {
    let decoded = decode(token)?;
    decoded.verify_signature(key)?;
    Ok(decoded)
}

/// Checks `nbf` / `exp` (seconds since the epoch) against `now`.
pub fn check_validity_window(
    nbf: Option<i64>,
    exp: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(), ProofError> {
    let now_secs = now.timestamp();
    if let Some(nbf) = nbf {
        if now_secs < nbf {
            return Err(ProofError::NotYetValid(timestamp(nbf)));
        }
    }
    if let Some(exp) = exp {
        if now_secs >= exp {
            return Err(ProofError::Expired(timestamp(exp)));
        }
    }
    Ok(())
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
