// src/utils/mod.rs
//! Helper functions: key encodings, JWT codec, serialization.

pub mod crypto;
pub mod jwt;
pub mod serialization;
