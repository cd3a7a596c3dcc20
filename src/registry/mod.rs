// src/registry/mod.rs
//! DID registry access.

pub mod did_registry;

pub use did_registry::{
    resolve_verification_key, DidRegistry, HttpDidRegistry, InMemoryDidRegistry,
};
