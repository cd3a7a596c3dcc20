// src/wallet/mod.rs
//! Key material and holder-side credential handling.

pub mod credential_storage;
pub mod key_management;
