// src/services/api_server.rs
//! API Server for the university issuer
//!
//! Exposes the issuance flow over HTTP using Axum:
//! - `POST /issue-vc` verifies a presentation and issues a diploma credential
//! - `GET /did` returns the issuer's current DID Document
//! - `GET /health` liveness check
//!
//! A panic while handling a request is caught, logged and answered with a
//! bare `500`; the process keeps serving.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::{debug, error, info};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::IssuanceError;
use crate::services::issuance::{IssuanceService, IssueRequest};

impl IntoResponse for IssuanceError {
    fn into_response(self) -> Response {
        let status = match &self {
            IssuanceError::Verification(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IssuanceError::PolicyNoMatch => StatusCode::FORBIDDEN,
            IssuanceError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut detail = json!({
            "code": status.as_u16(),
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let IssuanceError::Verification(failure) = &self {
            detail["stage"] = json!(failure.stage.name());
            if let Some(index) = failure.stage.index() {
                detail["index"] = json!(index);
            }
        }

        (status, Json(json!({ "error": detail }))).into_response()
    }
}

/// Logs a caught panic and answers `500` without a body.
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!("recovered from panic while handling request: {}", message);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// API server state
pub struct ApiServer {
    service: IssuanceService,
}

impl ApiServer {
    pub fn new(service: IssuanceService) -> Self {
        ApiServer { service }
    }

    /// Routes plus the panic recovery barrier.
    pub fn router(self) -> Router {
        Router::new()
            .route("/issue-vc", post(Self::issue_vc_handler))
            .route("/did", get(Self::did_document_handler))
            .route("/health", get(Self::health_handler))
            .layer(ServiceBuilder::new().layer(CatchPanicLayer::custom(handle_panic)))
            .with_state(Arc::new(self))
    }

    /// Binds `addr` and serves until the process is stopped.
    pub async fn run(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server running at http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }

    /// Verifies the presented VP and issues a diploma credential.
    ///
    /// # Endpoint
    /// POST /issue-vc
    ///
    /// # Responses
    /// - 200 OK: `{"result": "OK", "vc": <VC-JWT>}`
    /// - 200 OK: `{"result": "FAIL", "vc": "VP is invalid"}` for an empty or `"NONE"` VP
    /// - 422 Unprocessable Entity: VP or VC failed verification
    /// - 403 Forbidden: no presented credential is eligible
    /// - 500 Internal Server Error: the credential could not be issued
    async fn issue_vc_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<IssueRequest>,
    ) -> Result<impl IntoResponse, IssuanceError> {
        debug!("issue-vc request with {} byte VP", payload.vp.len());
        let response = state.service.handle_issuance_request(&payload).await?;
        Ok(Json(response))
    }

    /// Returns the current issuer DID Document.
    ///
    /// # Endpoint
    /// GET /did
    async fn did_document_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        let identity = state.service.identity().snapshot();
        Json(identity.document().clone())
    }

    async fn health_handler() -> impl IntoResponse {
        Json(json!({ "status": "ok" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::CredentialSubject;
    use crate::models::did::DidDocument;
    use crate::registry::InMemoryDidRegistry;
    use crate::services::credential_issuer::{CredentialIssuer, SubjectSource};
    use crate::services::identity::{IssuerIdentity, SharedIdentity, DEFAULT_DID_METHOD};
    use crate::services::policy::{EligibilityPredicate, RequiredClaims};
    use crate::services::verifier::Verifier;
    use crate::wallet::credential_storage::HolderWallet;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        university: IssuerIdentity,
        holder: HolderWallet,
    }

    async fn app_with_policy(policy: Arc<dyn EligibilityPredicate>) -> TestApp {
        let registry = Arc::new(InMemoryDidRegistry::new());
        let university = IssuerIdentity::generate(DEFAULT_DID_METHOD).unwrap();
        university.register(registry.as_ref()).await.unwrap();
        let holder = HolderWallet::generate(DEFAULT_DID_METHOD).unwrap();
        holder.register(registry.as_ref()).await.unwrap();

        let service = IssuanceService::new(
            SharedIdentity::new(university.clone()),
            Verifier::new(registry),
            policy,
            CredentialIssuer::default(),
            SubjectSource::Default,
        );
        TestApp {
            router: ApiServer::new(service).router(),
            university,
            holder,
        }
    }

    async fn app() -> TestApp {
        app_with_policy(Arc::new(RequiredClaims::default())).await
    }

    /// A VP carrying one credential, issued by the university itself.
    fn presentation(app: &TestApp, subject: Value) -> String {
        let vc = CredentialIssuer::default()
            .issue_credential(&app.university, subject.as_object().cloned().unwrap())
            .unwrap();
        app.holder.sign_presentation(vec![vc]).unwrap()
    }

    fn issue_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/issue-vc")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_issue_vc_ok() {
        let app = app().await;
        let vp = presentation(
            &app,
            serde_json::json!({ "name": "HONG KIL DONG", "birthDate": "2000-01-01" }),
        );

        let (status, body) =
            send(app.router.clone(), issue_request(serde_json::json!({ "vp": vp }))).await;
        assert_eq!(status, StatusCode::OK);

        let body = json_body(&body);
        assert_eq!(body["result"], "OK");
        assert_eq!(body["vc"].as_str().unwrap().split('.').count(), 3);
    }

    #[tokio::test]
    async fn test_issue_vc_soft_fail_for_sentinel_and_missing_vp() {
        let app = app().await;
        for body in [serde_json::json!({ "vp": "NONE" }), serde_json::json!({})] {
            let (status, bytes) = send(app.router.clone(), issue_request(body)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                json_body(&bytes),
                serde_json::json!({ "result": "FAIL", "vc": "VP is invalid" })
            );
        }
    }

    #[tokio::test]
    async fn test_issue_vc_verification_failure_is_422() {
        let app = app().await;
        let (status, bytes) = send(
            app.router.clone(),
            issue_request(serde_json::json!({ "vp": "a.b.c" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(&bytes);
        assert_eq!(body["error"]["code"], 422);
        assert_eq!(body["error"]["kind"], "verification_failure");
        assert_eq!(body["error"]["stage"], "vp");
        assert!(body["error"].get("index").is_none());
    }

    #[tokio::test]
    async fn test_issue_vc_bad_vc_reports_index() {
        let app = app().await;
        let stranger = IssuerIdentity::generate(DEFAULT_DID_METHOD).unwrap();
        let vc = CredentialIssuer::default()
            .issue_credential(&stranger, CredentialSubject::new())
            .unwrap();
        let vp = app.holder.sign_presentation(vec![vc]).unwrap();

        let (status, bytes) =
            send(app.router.clone(), issue_request(serde_json::json!({ "vp": vp }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(&bytes);
        assert_eq!(body["error"]["stage"], "vc");
        assert_eq!(body["error"]["index"], 0);
    }

    #[tokio::test]
    async fn test_issue_vc_policy_no_match_is_403() {
        let app = app().await;
        let vp = presentation(&app, serde_json::json!({ "name": "KIM" }));

        let (status, bytes) =
            send(app.router.clone(), issue_request(serde_json::json!({ "vp": vp }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json_body(&bytes)["error"]["kind"], "policy_no_match");
    }

    #[tokio::test]
    async fn test_panic_is_caught_and_answered_with_bare_500() {
        let exploding = |_: &CredentialSubject| -> bool { panic!("policy exploded") };
        let app = app_with_policy(Arc::new(exploding)).await;
        let vp = presentation(&app, serde_json::json!({ "name": "KIM" }));

        let (status, bytes) =
            send(app.router.clone(), issue_request(serde_json::json!({ "vp": vp }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(bytes.is_empty());

        // The router still serves afterwards.
        let (status, _) = send(
            app.router.clone(),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_did_document_endpoint() {
        let app = app().await;
        let (status, bytes) = send(
            app.router.clone(),
            Request::builder().uri("/did").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let document: DidDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(&document, app.university.document());
    }
}
