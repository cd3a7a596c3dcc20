// src/utils/crypto.rs
//! Public key encodings used by DIDs and DID Documents.
//!
//! All encodings operate on the 33-byte compressed SEC1 form of a secp256k1
//! public key.

use k256::ecdsa::VerifyingKey;
use multibase::Base;

use crate::error::KeyError;

/// Compressed SEC1 bytes of a verifying key.
pub fn compressed_public_key(key: &VerifyingKey) -> Vec<u8> {
    key.to_encoded_point(true).as_bytes().to_vec()
}

/// Plain base58 (bitcoin alphabet) of the compressed key. Used as the
/// method-specific id of a DID.
pub fn public_key_base58(key: &VerifyingKey) -> String {
    bs58::encode(compressed_public_key(key)).into_string()
}

/// Base58btc multibase (`z` prefix) of the compressed key, as published in
/// `publicKeyMultibase`.
pub fn public_key_multibase(key: &VerifyingKey) -> String {
    multibase::encode(Base::Base58Btc, compressed_public_key(key))
}

/// Decodes a `publicKeyMultibase` value back into a verifying key.
///
/// # Errors
/// - [`KeyError::Multibase`] if the string is not multibase
/// - [`KeyError::UnexpectedBase`] if it is not base58btc
/// - [`KeyError::InvalidPublicKey`] if the bytes are not a curve point
pub fn decode_public_key_multibase(encoded: &str) -> Result<VerifyingKey, KeyError> {
    let (base, bytes) = multibase::decode(encoded)?;
    if base != Base::Base58Btc {
        return Err(KeyError::UnexpectedBase(base));
    }
    Ok(VerifyingKey::from_sec1_bytes(&bytes)?)
}
