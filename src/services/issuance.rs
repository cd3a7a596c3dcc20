// src/services/issuance.rs
//! Issuance Orchestrator
//!
//! Ties the pipeline together for one request: verify the presentation,
//! apply the eligibility policy, then sign a new diploma credential.
//!
//! # Rejection channels
//! An empty or `"NONE"` presentation is a soft rejection: the call succeeds
//! with [`IssuanceResult::Fail`] and a reason. Every other rejection
//! (signature, structure, policy) is an [`IssuanceError`]. Clients rely on
//! the difference, so the two must not be merged.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::IssuanceError;
use crate::services::credential_issuer::{CredentialIssuer, SubjectSource};
use crate::services::identity::SharedIdentity;
use crate::services::policy::{evaluate, Eligibility, EligibilityPredicate};
use crate::services::verifier::{PresentationCheck, Verifier};

/// Body of an issuance request. A missing `vp` is treated as empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueRequest {
    #[serde(default)]
    pub vp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssuanceResult {
    Ok,
    Fail,
}

/// Response of an issuance request.
///
/// `vc` holds the issued VC-JWT on `OK` and the rejection reason on `FAIL`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuanceResponse {
    pub result: IssuanceResult,
    pub vc: String,
}

impl IssuanceResponse {
    pub fn ok(token: String) -> Self {
        Self {
            result: IssuanceResult::Ok,
            vc: token,
        }
    }

    pub fn fail(reason: &str) -> Self {
        Self {
            result: IssuanceResult::Fail,
            vc: reason.to_string(),
        }
    }
}

/// Everything a request needs, shared across concurrent requests.
#[derive(Clone)]
pub struct IssuanceService {
    identity: SharedIdentity,
    verifier: Verifier,
    policy: Arc<dyn EligibilityPredicate>,
    issuer: CredentialIssuer,
    subject_source: SubjectSource,
}

impl IssuanceService {
    pub fn new(
        identity: SharedIdentity,
        verifier: Verifier,
        policy: Arc<dyn EligibilityPredicate>,
        issuer: CredentialIssuer,
        subject_source: SubjectSource,
    ) -> Self {
        Self {
            identity,
            verifier,
            policy,
            issuer,
            subject_source,
        }
    }

    pub fn identity(&self) -> &SharedIdentity {
        &self.identity
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Handles one issuance request.
    ///
    /// # Process Flow
    /// 1. Take a snapshot of the issuer identity
    /// 2. Run the presentation pipeline; a soft rejection ends here with `FAIL`
    /// 3. Apply the policy; the first eligible credential wins
    /// 4. Sign and return the diploma credential with `OK`
    ///
    /// # Errors
    /// - [`IssuanceError::Verification`] if the VP or any VC does not verify
    /// - [`IssuanceError::PolicyNoMatch`] if no credential is eligible
    /// - [`IssuanceError::Credential`] if the new credential cannot be built or signed
    pub async fn handle_issuance_request(
        &self,
        request: &IssueRequest,
    ) -> Result<IssuanceResponse, IssuanceError> {
        let identity = self.identity.snapshot();

        let credentials = match self.verifier.verify_presentation(&request.vp).await? {
            PresentationCheck::Rejected(reason) => return Ok(IssuanceResponse::fail(reason)),
            PresentationCheck::Verified(credentials) => credentials,
        };

        if let Eligibility::NoMatch = evaluate(self.policy.as_ref(), &credentials) {
            info!("no matching credential among {} presented", credentials.len());
            return Err(IssuanceError::PolicyNoMatch);
        }

        let token = self
            .issuer
            .issue_from_source(&identity, &self.subject_source)?;
        info!("issued diploma credential as {}", identity.did());
        Ok(IssuanceResponse::ok(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProofError, Stage};
    use crate::models::credential::VcClaims;
    use crate::registry::InMemoryDidRegistry;
    use crate::services::credential_issuer::DIPLOMA_CREDENTIAL_TYPES;
    use crate::services::identity::{IssuerIdentity, DEFAULT_DID_METHOD};
    use crate::services::policy::RequiredClaims;
    use crate::utils::jwt::{decode, decode_verify};
    use crate::wallet::credential_storage::HolderWallet;
    use serde_json::json;
    use std::path::PathBuf;

    struct Setup {
        registry: Arc<InMemoryDidRegistry>,
        service: IssuanceService,
        ministry: IssuerIdentity,
        holder: HolderWallet,
    }

    async fn setup(subject_source: SubjectSource) -> Setup {
        let registry = Arc::new(InMemoryDidRegistry::new());
        let university = IssuerIdentity::generate(DEFAULT_DID_METHOD).unwrap();
        university.register(registry.as_ref()).await.unwrap();
        // Issuer of the credentials the holder presents.
        let ministry = IssuerIdentity::generate(DEFAULT_DID_METHOD).unwrap();
        ministry.register(registry.as_ref()).await.unwrap();
        let holder = HolderWallet::generate(DEFAULT_DID_METHOD).unwrap();
        holder.register(registry.as_ref()).await.unwrap();

        let service = IssuanceService::new(
            SharedIdentity::new(university),
            Verifier::new(registry.clone()),
            Arc::new(RequiredClaims::default()),
            CredentialIssuer::default(),
            subject_source,
        );
        Setup {
            registry,
            service,
            ministry,
            holder,
        }
    }

    fn credential_for(issuer: &IssuerIdentity, subject: serde_json::Value) -> String {
        CredentialIssuer::default()
            .issue_credential(issuer, subject.as_object().cloned().unwrap())
            .unwrap()
    }

    fn request(vp: String) -> IssueRequest {
        IssueRequest { vp }
    }

    fn eligible_subject() -> serde_json::Value {
        json!({ "name": "HONG KIL DONG", "birthDate": "2000-01-01" })
    }

    #[tokio::test]
    async fn test_eligible_presentation_gets_diploma() {
        let subject_path = std::env::temp_dir().join(format!(
            "issuance-subject-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &subject_path,
            r#"{"name": "HONG KIL DONG", "degree": "Bachelor of Science"}"#,
        )
        .unwrap();
        let s = setup(SubjectSource::JsonFile(subject_path.clone())).await;

        let mut holder = s.holder.clone();
        let id = holder
            .receive(&credential_for(&s.ministry, eligible_subject()))
            .unwrap();
        let vp = holder.present(&[id.as_str()]).unwrap();

        let response = s.service.handle_issuance_request(&request(vp)).await.unwrap();
        assert_eq!(response.result, IssuanceResult::Ok);

        let identity = s.service.identity().snapshot();
        let claims = s.service.verifier().verify_vc(&response.vc).await.unwrap();
        assert_eq!(claims.iss, identity.did().to_string());
        assert_eq!(claims.vc.types, DIPLOMA_CREDENTIAL_TYPES);
        assert_eq!(
            serde_json::Value::Object(claims.vc.credential_subject),
            json!({ "name": "HONG KIL DONG", "degree": "Bachelor of Science" })
        );
        std::fs::remove_file(subject_path).ok();
    }

    #[tokio::test]
    async fn test_sentinel_is_soft_fail() {
        let s = setup(SubjectSource::Default).await;
        for vp in ["", "NONE"] {
            let response = s
                .service
                .handle_issuance_request(&request(vp.to_string()))
                .await
                .unwrap();
            assert_eq!(response, IssuanceResponse::fail("VP is invalid"));
            assert_eq!(
                serde_json::to_value(&response).unwrap(),
                json!({ "result": "FAIL", "vc": "VP is invalid" })
            );
        }
    }

    #[tokio::test]
    async fn test_missing_vp_field_counts_as_empty() {
        let body: IssueRequest = serde_json::from_str("{}").unwrap();
        assert!(body.vp.is_empty());

        let s = setup(SubjectSource::Default).await;
        let response = s.service.handle_issuance_request(&body).await.unwrap();
        assert_eq!(response.result, IssuanceResult::Fail);
    }

    #[tokio::test]
    async fn test_ineligible_subject_is_policy_error() {
        let s = setup(SubjectSource::Default).await;
        let vc = credential_for(
            &s.ministry,
            json!({ "name": "HONG KIL DONG", "birthDate": "1999-01-01" }),
        );
        let vp = s.holder.sign_presentation(vec![vc]).unwrap();

        let err = s.service.handle_issuance_request(&request(vp)).await.unwrap_err();
        assert!(matches!(err, IssuanceError::PolicyNoMatch));
        assert_eq!(err.kind(), "policy_no_match");
    }

    #[tokio::test]
    async fn test_invalid_vc_is_verification_error() {
        let s = setup(SubjectSource::Default).await;
        let unregistered = IssuerIdentity::generate(DEFAULT_DID_METHOD).unwrap();
        let vp = s
            .holder
            .sign_presentation(vec![
                credential_for(&s.ministry, json!({ "name": "KIM" })),
                credential_for(&unregistered, eligible_subject()),
            ])
            .unwrap();

        match s.service.handle_issuance_request(&request(vp)).await {
            Err(IssuanceError::Verification(failure)) => {
                assert_eq!(failure.stage, Stage::Vc { index: 1 });
                assert!(matches!(failure.cause, ProofError::Resolution(_)));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subject_source_failure_is_credential_error() {
        let s = setup(SubjectSource::JsonFile(PathBuf::from("missing/university_vc.json"))).await;
        let vc = credential_for(&s.ministry, eligible_subject());
        let vp = s.holder.sign_presentation(vec![vc]).unwrap();

        let err = s.service.handle_issuance_request(&request(vp)).await.unwrap_err();
        assert_eq!(err.kind(), "credential_error");
    }

    #[tokio::test]
    async fn test_reprovisioned_identity_signs_new_credentials() {
        let s = setup(SubjectSource::Default).await;
        let vc = credential_for(&s.ministry, eligible_subject());
        let vp = s.holder.sign_presentation(vec![vc]).unwrap();

        let first = s.service.handle_issuance_request(&request(vp.clone())).await.unwrap();
        let old_identity = s.service.identity().snapshot();

        s.service
            .identity()
            .reprovision(DEFAULT_DID_METHOD, s.registry.as_ref())
            .await
            .unwrap()
            .unwrap();
        let new_identity = s.service.identity().snapshot();
        assert_ne!(old_identity.did(), new_identity.did());

        let second = s.service.handle_issuance_request(&request(vp)).await.unwrap();
        let claims = decode::<VcClaims>(&second.vc).unwrap().claims;
        assert_eq!(claims.iss, new_identity.did().to_string());

        // Tokens of the first identity do not verify under the second key.
        assert!(matches!(
            decode_verify::<VcClaims>(&first.vc, new_identity.keys().verifying_key()),
            Err(ProofError::BadSignature)
        ));
        // They still verify through the registry, under their own DID.
        assert!(s.service.verifier().verify_vc(&first.vc).await.is_ok());
    }
}
