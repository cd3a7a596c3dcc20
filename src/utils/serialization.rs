// src/utils/serialization.rs
//! Serialization utilities for the issuer.
//!
//! Provides helpers for:
//! - JSON data structures
//! - base64url (unpadded) JSON segments used by compact JWS
//! - Loading credential-subject JSON documents from disk

use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CredentialError, ProofError};

/// Serializes a value to a JSON string.
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Deserializes a value from a JSON string.
///
/// # Note
/// The lifetime parameter lets the deserialized value borrow from the input.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// Encodes raw bytes as unpadded base64url.
pub fn base64url_encode(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Serializes a value to JSON and encodes it as one JWS segment.
pub fn base64url_encode_json<T: Serialize>(data: &T) -> Result<String, ProofError> {
    let json = serialize(data)?;
    Ok(base64url_encode(json.as_bytes()))
}

/// Decodes one JWS segment into a value.
pub fn base64url_decode_json<T: DeserializeOwned>(segment: &str) -> Result<T, ProofError> {
    let bytes = base64::decode_config(segment, base64::URL_SAFE_NO_PAD)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Loads a JSON object mapping claim names to claim values.
///
/// # Errors
/// [`CredentialError::SubjectSource`] if the file cannot be read, is not
/// valid JSON, or its top level is not an object. Nothing is silently
/// replaced with an empty map.
pub fn load_json_object(path: &Path) -> Result<Map<String, Value>, CredentialError> {
    let source_error = |reason: String| CredentialError::SubjectSource {
        path: path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(path).map_err(|e| source_error(e.to_string()))?;
    match deserialize::<Value>(&text).map_err(|e| source_error(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(source_error(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.json", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_segment_is_unpadded_base64url() {
        let segment = base64url_encode_json(&serde_json::json!({ "alg": "ES256K" })).unwrap();
        assert!(!segment.contains('='));
        assert!(!segment.contains('+') && !segment.contains('/'));

        let decoded: Value = base64url_decode_json(&segment).unwrap();
        assert_eq!(decoded["alg"], "ES256K");
    }

    #[test]
    fn test_garbage_segment_is_malformed() {
        let result: Result<Value, _> = base64url_decode_json("not base64!");
        assert!(matches!(result, Err(ProofError::Malformed(_))));
    }

    #[test]
    fn test_load_json_object() {
        let path = temp_file(
            "subject-ok",
            r#"{"name": "HONG KIL DONG", "university": "SSI University"}"#,
        );
        let subject = load_json_object(&path).unwrap();
        assert_eq!(subject["university"], "SSI University");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_json_object_reports_failures() {
        let missing = std::env::temp_dir().join("definitely-missing-subject.json");
        assert!(matches!(
            load_json_object(&missing),
            Err(CredentialError::SubjectSource { .. })
        ));

        let invalid = temp_file("subject-invalid", "{ name: ");
        assert!(matches!(
            load_json_object(&invalid),
            Err(CredentialError::SubjectSource { .. })
        ));
        fs::remove_file(invalid).ok();

        let array = temp_file("subject-array", "[1, 2]");
        match load_json_object(&array) {
            Err(CredentialError::SubjectSource { reason, .. }) => {
                assert!(reason.contains("an array"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        fs::remove_file(array).ok();
    }
}
