//! Reset code model - one pending one-time code per credential.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;

/// Pending password-reset code, keyed by the owning identity's email.
/// Upsert semantics: a new request overwrites any prior pending code.
#[derive(Debug, Clone, FromRow)]
pub struct ResetCode {
    pub credential_key: String,
    pub code_hash: String,
    pub issued_utc: DateTime<Utc>,
}

impl ResetCode {
    pub fn new(credential_key: &str, code_hash: String) -> Self {
        Self {
            credential_key: credential_key.to_string(),
            code_hash,
            issued_utc: Utc::now(),
        }
    }

    /// SHA-256 of the plaintext code, hex-encoded.
    pub fn hash_code(code: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self, validity_minutes: i64) -> bool {
        Utc::now() - self.issued_utc > Duration::minutes(validity_minutes)
    }
}
