// src/services/policy.rs
//! Eligibility policy applied to verified credentials.
//!
//! The predicate is a pure function of a credential subject. [`evaluate`]
//! scans credentials in presentation order and stops at the first match.

use std::collections::BTreeMap;

use log::{debug, info};
use serde_json::Value;

use crate::models::credential::CredentialSubject;
use crate::services::verifier::VerifiedCredential;

/// Decides whether a credential subject qualifies for issuance.
pub trait EligibilityPredicate: Send + Sync {
    fn is_eligible(&self, subject: &CredentialSubject) -> bool;
}

impl<F> EligibilityPredicate for F
where
    F: Fn(&CredentialSubject) -> bool + Send + Sync,
{
    fn is_eligible(&self, subject: &CredentialSubject) -> bool {
        self(subject)
    }
}

/// Predicate requiring every listed claim to be present with an equal value.
///
/// An empty claim set admits any subject.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredClaims {
    claims: BTreeMap<String, Value>,
}

impl RequiredClaims {
    pub fn new(claims: BTreeMap<String, Value>) -> Self {
        Self { claims }
    }

    /// Builds the predicate from plain string claims, as read from settings.
    pub fn from_strings<I, K, V>(claims: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            claims
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    pub fn claims(&self) -> &BTreeMap<String, Value> {
        &self.claims
    }
}

impl Default for RequiredClaims {
    /// `name == "HONG KIL DONG"` and `birthDate == "2000-01-01"`.
    fn default() -> Self {
        Self::from_strings([("name", "HONG KIL DONG"), ("birthDate", "2000-01-01")])
    }
}

impl EligibilityPredicate for RequiredClaims {
    fn is_eligible(&self, subject: &CredentialSubject) -> bool {
        self.claims
            .iter()
            .all(|(claim, expected)| subject.get(claim) == Some(expected))
    }
}

/// Result of applying the policy to a verified credential list.
#[derive(Debug)]
pub enum Eligibility<'a> {
    Match {
        index: usize,
        credential: &'a VerifiedCredential,
    },
    NoMatch,
}

impl Eligibility<'_> {
    pub fn is_match(&self) -> bool {
        matches!(self, Eligibility::Match { .. })
    }
}

/// Returns the first credential whose subject satisfies `predicate`.
///
/// Credentials after the first match are never inspected.
pub fn evaluate<'a>(
    predicate: &dyn EligibilityPredicate,
    credentials: &'a [VerifiedCredential],
) -> Eligibility<'a> {
    match credentials
        .iter()
        .find(|credential| predicate.is_eligible(credential.credential_subject()))
    {
        Some(credential) => {
            info!("VC #{} satisfies the issuance policy", credential.index);
            Eligibility::Match {
                index: credential.index,
                credential,
            }
        }
        None => {
            debug!("none of {} VC(s) satisfies the issuance policy", credentials.len());
            Eligibility::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::{VcClaims, VerifiableCredential};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn credential(index: usize, subject: Value) -> VerifiedCredential {
        let vc = VerifiableCredential::new(
            "urn:test",
            &["VerifiableCredential"],
            "did:ssikr:issuer",
            subject.as_object().cloned().unwrap(),
        )
        .unwrap();
        VerifiedCredential {
            index,
            token: format!("token-{}", index),
            claims: VcClaims {
                iss: "did:ssikr:issuer".into(),
                jti: None,
                iat: None,
                nbf: None,
                exp: None,
                vc,
            },
        }
    }

    #[test]
    fn test_default_requires_name_and_birth_date() {
        let policy = RequiredClaims::default();
        let eligible = json!({ "name": "HONG KIL DONG", "birthDate": "2000-01-01", "extra": 1 });
        let wrong_date = json!({ "name": "HONG KIL DONG", "birthDate": "2000-01-02" });
        let missing = json!({ "name": "HONG KIL DONG" });

        assert!(policy.is_eligible(eligible.as_object().unwrap()));
        assert!(!policy.is_eligible(wrong_date.as_object().unwrap()));
        assert!(!policy.is_eligible(missing.as_object().unwrap()));
    }

    #[test]
    fn test_values_compare_as_json() {
        let policy = RequiredClaims::from_strings([("year", "2000")]);
        assert!(!policy.is_eligible(json!({ "year": 2000 }).as_object().unwrap()));
        assert!(policy.is_eligible(json!({ "year": "2000" }).as_object().unwrap()));
    }

    #[test]
    fn test_empty_policy_admits_anything() {
        let policy = RequiredClaims::new(BTreeMap::new());
        let list = vec![credential(0, json!({}))];
        assert!(evaluate(&policy, &list).is_match());
    }

    #[test]
    fn test_first_match_wins() {
        let list = vec![
            credential(0, json!({ "name": "KIM" })),
            credential(1, json!({ "name": "HONG KIL DONG", "birthDate": "2000-01-01" })),
            credential(2, json!({ "name": "HONG KIL DONG", "birthDate": "2000-01-01" })),
        ];

        match evaluate(&RequiredClaims::default(), &list) {
            Eligibility::Match { index, credential } => {
                assert_eq!(index, 1);
                assert_eq!(credential.token, "token-1");
            }
            Eligibility::NoMatch => panic!("expected a match"),
        }
    }

    #[test]
    fn test_later_credentials_are_not_inspected() {
        let seen = AtomicUsize::new(0);
        let counting = |subject: &CredentialSubject| {
            seen.fetch_add(1, Ordering::SeqCst);
            subject.get("name") == Some(&json!("match"))
        };
        let list = vec![
            credential(0, json!({ "name": "no" })),
            credential(1, json!({ "name": "match" })),
            credential(2, json!({ "name": "match" })),
            credential(3, json!({ "name": "no" })),
        ];

        assert!(evaluate(&counting, &list).is_match());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_no_match() {
        let list = vec![credential(0, json!({ "name": "HONG KIL DONG" }))];
        assert!(matches!(
            evaluate(&RequiredClaims::default(), &list),
            Eligibility::NoMatch
        ));
        assert!(matches!(
            evaluate(&RequiredClaims::default(), &[]),
            Eligibility::NoMatch
        ));
    }
}
