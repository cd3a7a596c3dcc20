// src/services/verifier.rs
//! Presentation verification pipeline.
//!
//! Verifies a VP-JWT, then each embedded VC-JWT in presentation order. The
//! pipeline is fail-fast: the first invalid token aborts the whole
//! presentation and later credentials are never looked at.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use crate::error::{ProofError, VerificationFailure};
use crate::models::credential::{CredentialSubject, VcClaims};
use crate::models::did::Did;
use crate::models::presentation::VpClaims;
use crate::registry::{resolve_verification_key, DidRegistry};
use crate::utils::jwt::{check_validity_window, decode};

/// Literal a client sends when it has nothing to present.
pub const NO_PRESENTATION_SENTINEL: &str = "NONE";

/// Reason carried by the soft `FAIL` response.
pub const INVALID_PRESENTATION_REASON: &str = "VP is invalid";

/// A credential whose JWT verified against its issuer's published key.
#[derive(Debug, Clone)]
pub struct VerifiedCredential {
    /// Position within the presentation
    pub index: usize,
    /// The original VC-JWT
    pub token: String,
    pub claims: VcClaims,
}

impl VerifiedCredential {
    pub fn credential_subject(&self) -> &CredentialSubject {
        self.claims.credential_subject()
    }
}

/// Outcome of a pipeline run that did not hit a hard failure.
#[derive(Debug)]
pub enum PresentationCheck {
    /// Empty or sentinel input; answered with a soft `FAIL`, never an error.
    Rejected(&'static str),
    /// All credentials verified, in presentation order.
    Verified(Vec<VerifiedCredential>),
}

/// Verifies presentations by resolving signer keys through a DID registry.
#[derive(Clone)]
pub struct Verifier {
    registry: Arc<dyn DidRegistry>,
}

impl Verifier {
    pub fn new(registry: Arc<dyn DidRegistry>) -> Self {
        Self { registry }
    }

    /// Runs the full pipeline on a VP-JWT.
    ///
    /// # Process Flow
    /// 1. Empty / `"NONE"` input short-circuits with [`PresentationCheck::Rejected`]
    /// 2. VP-JWT is parsed and verified; failure is stage `vp`
    /// 3. Each embedded VC-JWT is parsed and verified in order; the first
    ///    failure is stage `vc` with its index
    ///
    /// # Errors
    /// [`VerificationFailure`] for any signature or structural failure. No
    /// partial results are returned.
    pub async fn verify_presentation(
        &self,
        vp_token: &str,
    ) -> Result<PresentationCheck, VerificationFailure> {
        if vp_token.is_empty() || vp_token == NO_PRESENTATION_SENTINEL {
            warn!("rejecting empty presentation");
            return Ok(PresentationCheck::Rejected(INVALID_PRESENTATION_REASON));
        }

        let vp_claims = self.verify_vp(vp_token).await.map_err(|cause| {
            info!("VP is NOT verified: {}", cause);
            VerificationFailure::vp(cause)
        })?;
        info!("VP from {} is verified", vp_claims.iss);

        let mut verified = Vec::with_capacity(vp_claims.vp.verifiable_credential.len());
        for (index, vc_token) in vp_claims.vp.verifiable_credential.into_iter().enumerate() {
            let claims = self.verify_vc(&vc_token).await.map_err(|cause| {
                info!("VC #{} is NOT verified: {}", index, cause);
                VerificationFailure::vc(index, cause)
            })?;
            debug!("VC #{} from {} is verified", index, claims.iss);
            verified.push(VerifiedCredential {
                index,
                token: vc_token,
                claims,
            });
        }

        Ok(PresentationCheck::Verified(verified))
    }

    /// Parses and verifies a single VP-JWT.
    pub async fn verify_vp(&self, token: &str) -> Result<VpClaims, ProofError> {
        let claims: VpClaims = self.verify_jwt(token).await?;
        if let Some(holder) = &claims.vp.holder {
            check_signer(claims.iss.clone(), holder)?;
        }
        check_validity_window(claims.nbf, claims.exp, Utc::now())?;
        Ok(claims)
    }

    /// Parses and verifies a single VC-JWT.
    pub async fn verify_vc(&self, token: &str) -> Result<VcClaims, ProofError> {
        let claims: VcClaims = self.verify_jwt(token).await?;
        check_signer(claims.iss.clone(), &claims.vc.issuer)?;
        check_validity_window(claims.nbf, claims.exp, Utc::now())?;
        Ok(claims)
    }

    /// Decodes a token, resolves the key named by its `kid`, verifies the
    /// signature, and checks that `kid` belongs to the claimed `iss`.
    async fn verify_jwt<C>(&self, token: &str) -> Result<C, ProofError>
    where
        C: DeserializeOwned + HasIssuer,
    {
        let decoded = decode::<C>(token)?;
        let key = resolve_verification_key(self.registry.as_ref(), decoded.key_id()).await?;
        decoded.verify_signature(&key)?;

        let signer = Did::from_did_url(decoded.key_id())?.to_string();
        check_signer(signer, decoded.claims.issuer())?;
        Ok(decoded.claims)
    }
}

/// Claim sets that name the party that signed them.
trait HasIssuer {
    fn issuer(&self) -> &str;
}

impl HasIssuer for VcClaims {
    fn issuer(&self) -> &str {
        &self.iss
    }
}

impl HasIssuer for VpClaims {
    fn issuer(&self) -> &str {
        &self.iss
    }
}

fn check_signer(signer: String, issuer: &str) -> Result<(), ProofError> {
    if signer == issuer {
        Ok(())
    } else {
        Err(ProofError::SignerMismatch {
            signer,
            issuer: issuer.to_string(),
        })
    }
}
