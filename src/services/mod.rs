// src/services/mod.rs
//! Business logic: provisioning, issuance, verification, policy, and the API.

pub mod api_server;
pub mod credential_issuer;
pub mod identity;
pub mod issuance;
pub mod policy;
pub mod verifier;
