// src/models/mod.rs
//! Data structures shared by the issuer, verifier, and holder wallet.

pub mod credential;
pub mod did;
pub mod presentation;
