// src/main.rs

//! # University Issuer - Main Entry Point
//!
//! Provisions the issuer identity and starts the API server.
//!
//! ## Configuration
//! Read from `config/issuer.toml` (optional) and `ISSUER_*` environment
//! variables; a `.env` file is loaded first. A settings file given as the
//! first argument replaces `config/issuer.toml` and must exist:
//!
//! ```text
//! university-issuer /etc/university-issuer/issuer.toml
//! ```
//!
//! Notable keys:
//! - `ISSUER_BIND_ADDRESS`: listen address (default `127.0.0.1:3000`)
//! - `ISSUER_REGISTRY_URL`: remote DID registrar; in-memory registry when unset
//! - `ISSUER_CREDENTIAL_SUBJECT_PATH`: JSON subject of issued diplomas
//!
//! Log level follows `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use log::{info, warn};

use university_issuer::config::Settings;
use university_issuer::registry::{DidRegistry, HttpDidRegistry, InMemoryDidRegistry};
use university_issuer::services::api_server::ApiServer;
use university_issuer::services::credential_issuer::CredentialIssuer;
use university_issuer::services::identity::{provision, SharedIdentity};
use university_issuer::services::issuance::IssuanceService;
use university_issuer::services::verifier::Verifier;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment and settings
/// 2. Pick the DID registry
/// 3. Provision and publish the issuer identity
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Settings::load_from(&path)
            .with_context(|| format!("failed to load issuer settings from {}", path.display()))?,
        None => Settings::load().context("failed to load issuer settings")?,
    };
    let addr = settings
        .socket_addr()
        .with_context(|| format!("invalid bind address {:?}", settings.bind_address))?;
    let validity = settings
        .credential_validity()
        .context("invalid credential lifetime")?;

    let registry: Arc<dyn DidRegistry> = match &settings.registry_url {
        Some(url) => {
            info!("using DID registrar at {}", url);
            Arc::new(
                HttpDidRegistry::new(url)
                    .with_context(|| format!("invalid registry_url {:?}", url))?,
            )
        }
        None => {
            warn!("no registry_url configured; DID Documents are kept in memory only");
            Arc::new(InMemoryDidRegistry::new())
        }
    };

    // A failed publication is logged by `provision`; the issuer still serves.
    let (identity, _registration) = provision(&settings.did_method, registry.as_ref())
        .await
        .context("failed to provision issuer identity")?;
    info!("issuer DID: {}", identity.did());

    let service = IssuanceService::new(
        SharedIdentity::new(identity),
        Verifier::new(registry),
        Arc::new(settings.policy.predicate()),
        CredentialIssuer::new(validity),
        settings.subject_source(),
    );

    ApiServer::new(service)
        .run(addr)
        .await
        .context("API server terminated")?;
    Ok(())
}
