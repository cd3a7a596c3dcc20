// src/config.rs
//! Service settings.
//!
//! Layered with the `config` crate: built-in defaults, then the optional
//! `config/issuer.{toml,json,yaml}` file, then `ISSUER_*` environment
//! variables (`__` separates nested keys, e.g. `ISSUER_POLICY__...`).

use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::services::credential_issuer::SubjectSource;
use crate::services::identity::DEFAULT_DID_METHOD;
use crate::services::policy::RequiredClaims;

/// Base name of the settings file, relative to the working directory.
pub const CONFIG_FILE: &str = "config/issuer";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "ISSUER";

/// One claim the eligibility policy requires, e.g. `birthDate = "2000-01-01"`.
///
/// Claims are a list of entries rather than a table because table keys are
/// case-folded by the loader and claim names are camelCase.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClaimRequirement {
    pub claim: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicySettings {
    pub required_claims: Vec<ClaimRequirement>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        let required_claims = [("name", "HONG KIL DONG"), ("birthDate", "2000-01-01")]
            .into_iter()
            .map(|(claim, value)| ClaimRequirement {
                claim: claim.to_string(),
                value: value.to_string(),
            })
            .collect();
        Self { required_claims }
    }
}

impl PolicySettings {
    pub fn predicate(&self) -> RequiredClaims {
        RequiredClaims::from_strings(
            self.required_claims
                .iter()
                .map(|r| (r.claim.clone(), r.value.clone())),
        )
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub bind_address: String,

    /// DID method of the provisioned issuer
    pub did_method: String,

    /// Base URL of a remote DID registrar; in-memory registry when unset
    pub registry_url: Option<String>,

    /// JSON file holding the issued credential's subject
    pub credential_subject_path: Option<PathBuf>,

    /// Lifetime of issued credentials in seconds; `0` or unset issues
    /// credentials without an `exp` claim
    pub credential_validity_secs: Option<i64>,

    pub policy: PolicySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            did_method: DEFAULT_DID_METHOD.to_string(),
            registry_url: None,
            credential_subject_path: None,
            credential_validity_secs: Some(31_536_000),
            policy: PolicySettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from [`CONFIG_FILE`] (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name(CONFIG_FILE).required(false))
    }

    /// Loads settings from an explicit file plus the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.bind_address.parse()
    }

    pub fn subject_source(&self) -> SubjectSource {
        SubjectSource::from(self.credential_subject_path.clone())
    }

    /// Lifetime of issued credentials, `None` for credentials that never expire.
    ///
    /// # Errors
    /// [`ConfigError::Message`] for a negative lifetime or one whose expiry
    /// would fall outside the representable date range.
    pub fn credential_validity(&self) -> Result<Option<Duration>, ConfigError> {
        let secs = match self.credential_validity_secs {
            None | Some(0) => return Ok(None),
            Some(secs) => secs,
        };
        let out_of_range = || {
            ConfigError::Message(format!(
                "credential_validity_secs = {} is out of range",
                secs
            ))
        };
        if secs < 0 {
            return Err(out_of_range());
        }

        let validity = Duration::try_seconds(secs).ok_or_else(out_of_range)?;
        Utc::now()
            .checked_add_signed(validity)
            .ok_or_else(out_of_range)?;
        Ok(Some(validity))
    }
}
