//! Field-level encryption for personal data at rest, using AES-256-GCM.
//!
//! Encoded values carry a marker prefix so legacy plaintext rows are
//! distinguishable from encrypted ones. Decoding is explicit and typed:
//! the store chooses what to do with legacy rows via [`LegacyFieldPolicy`]
//! instead of a property accessor silently swallowing failures.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use thiserror::Error;

/// Size of the AES-256 key in bytes.
const KEY_SIZE: usize = 32;

/// Size of the GCM nonce in bytes.
const NONCE_SIZE: usize = 12;

/// Marker prefix on encoded values. Anything without it is a legacy row.
const ENCODED_PREFIX: &str = "enc$";

#[derive(Debug, Error)]
pub enum FieldCodecError {
    #[error("invalid field encryption key length: expected {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid field encryption key format: {0}")]
    InvalidKeyFormat(String),

    #[error("field encryption failed: {0}")]
    EncryptionFailed(String),
}

#[derive(Debug, Error)]
pub enum FieldDecodeError {
    /// The value does not carry the encoded marker: a legacy plaintext row.
    #[error("value is not field-encoded")]
    NotEncoded,

    /// Marker present but the payload is not parseable.
    #[error("encoded field is corrupt: {0}")]
    Corrupt(String),

    /// Authenticated decryption failed: wrong key or tampered ciphertext.
    #[error("field decryption failed")]
    Decrypt,
}

/// What a store does with a row that fails to decode as encrypted.
///
/// `PassThrough` accepts legacy plaintext rows (no marker) as-is. A value
/// that carries the marker but fails authenticated decryption is an error
/// under both policies; returning ciphertext as if it were plaintext is
/// never acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyFieldPolicy {
    PassThrough,
    Reject,
}

/// Encrypts and decrypts individual personal-data fields.
#[derive(Clone)]
pub struct FieldCodec {
    cipher: Aes256Gcm,
}

impl FieldCodec {
    /// Build from a hex-encoded 32-byte key (64 hex characters).
    pub fn from_hex_key(key_hex: &str) -> Result<Self, FieldCodecError> {
        let key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| FieldCodecError::InvalidKeyFormat(e.to_string()))?;
        Self::from_key(&key_bytes)
    }

    pub fn from_key(key: &[u8]) -> Result<Self, FieldCodecError> {
        if key.len() != KEY_SIZE {
            return Err(FieldCodecError::InvalidKeyLength(key.len()));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| FieldCodecError::InvalidKeyFormat(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Generate a fresh random key, hex-encoded, for initial setup.
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }

    /// Encrypt a field value into its stored form: `enc$<base64(nonce || ct)>`.
    pub fn encode(&self, plaintext: &str) -> Result<String, FieldCodecError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| FieldCodecError::EncryptionFailed(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("{ENCODED_PREFIX}{}", BASE64.encode(payload)))
    }

    /// Decrypt a stored field value.
    pub fn decode(&self, stored: &str) -> Result<String, FieldDecodeError> {
        let Some(encoded) = stored.strip_prefix(ENCODED_PREFIX) else {
            return Err(FieldDecodeError::NotEncoded);
        };

        let payload = BASE64
            .decode(encoded)
            .map_err(|e| FieldDecodeError::Corrupt(e.to_string()))?;

        if payload.len() < NONCE_SIZE {
            return Err(FieldDecodeError::Corrupt(format!(
                "payload shorter than nonce: {} bytes",
                payload.len()
            )));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| FieldDecodeError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|e| FieldDecodeError::Corrupt(e.to_string()))
    }

    /// Decode under an explicit legacy policy.
    ///
    /// `PassThrough` turns only `NotEncoded` into the raw value; every other
    /// failure propagates.
    pub fn decode_with_policy(
        &self,
        stored: &str,
        policy: LegacyFieldPolicy,
    ) -> Result<String, FieldDecodeError> {
        match self.decode(stored) {
            Ok(plain) => Ok(plain),
            Err(FieldDecodeError::NotEncoded) if policy == LegacyFieldPolicy::PassThrough => {
                Ok(stored.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCodec")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> FieldCodec {
        FieldCodec::from_key(&[7u8; KEY_SIZE]).unwrap()
    }

    #[test]
    fn encode_decode_roundtrip() {
        let codec = test_codec();
        let stored = codec.encode("Amélie").unwrap();

        assert!(stored.starts_with(ENCODED_PREFIX));
        assert_eq!(codec.decode(&stored).unwrap(), "Amélie");
    }

    #[test]
    fn same_plaintext_encodes_differently() {
        let codec = test_codec();
        let first = codec.encode("Durand").unwrap();
        let second = codec.encode("Durand").unwrap();

        assert_ne!(first, second);
        assert_eq!(codec.decode(&first).unwrap(), codec.decode(&second).unwrap());
    }

    #[test]
    fn legacy_row_is_not_encoded() {
        let codec = test_codec();
        assert!(matches!(
            codec.decode("Durand"),
            Err(FieldDecodeError::NotEncoded)
        ));
    }

    #[test]
    fn passthrough_policy_accepts_legacy_rows_only() {
        let codec = test_codec();

        let legacy = codec
            .decode_with_policy("Durand", LegacyFieldPolicy::PassThrough)
            .unwrap();
        assert_eq!(legacy, "Durand");

        // A tampered encoded value stays an error even under PassThrough.
        let stored = codec.encode("Durand").unwrap();
        let tampered = format!("{}AAAA", &stored[..stored.len() - 4]);
        assert!(matches!(
            codec.decode_with_policy(&tampered, LegacyFieldPolicy::PassThrough),
            Err(FieldDecodeError::Decrypt) | Err(FieldDecodeError::Corrupt(_))
        ));
    }

    #[test]
    fn reject_policy_refuses_legacy_rows() {
        let codec = test_codec();
        assert!(matches!(
            codec.decode_with_policy("Durand", LegacyFieldPolicy::Reject),
            Err(FieldDecodeError::NotEncoded)
        ));
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let codec = test_codec();
        let other = FieldCodec::from_key(&[8u8; KEY_SIZE]).unwrap();

        let stored = codec.encode("Durand").unwrap();
        assert!(matches!(other.decode(&stored), Err(FieldDecodeError::Decrypt)));
    }

    #[test]
    fn invalid_key_length_is_rejected() {
        assert!(matches!(
            FieldCodec::from_key(&[0u8; 16]),
            Err(FieldCodecError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn generated_keys_are_valid_and_distinct() {
        let first = FieldCodec::generate_key();
        let second = FieldCodec::generate_key();

        assert_eq!(first.len(), KEY_SIZE * 2);
        assert_ne!(first, second);
        assert!(FieldCodec::from_hex_key(&first).is_ok());
    }
}
