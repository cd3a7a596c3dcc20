// src/lib.rs
//! # University credential issuer
//!
//! Issues university diploma credentials as ES256K-signed VC-JWTs to holders
//! who present an eligible credential inside a signed VP-JWT.
//!
//! ## Layout
//! 1. **Models**: DID Document, VC and VP data structures
//! 2. **Wallet**: secp256k1 keys and the holder-side credential wallet
//! 3. **Utils**: key encodings, JWT codec, JSON helpers
//! 4. **Registry**: publication and resolution of DID Documents
//! 5. **Services**: provisioning, verification, policy, issuance, HTTP API

pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;
pub mod utils;
pub mod wallet;

pub use error::{IssuanceError, Stage, VerificationFailure};
pub use services::issuance::{IssuanceResponse, IssuanceResult, IssuanceService, IssueRequest};
pub use services::verifier::{PresentationCheck, Verifier};
