//! Refresh token model - long-lived, store-backed, single-use-for-rotation.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored refresh token. Only the SHA-256 hash of the opaque value is kept;
/// presented values are hashed before lookup.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub token_id: Uuid,
    pub identity_id: Uuid,
    pub token_hash_text: String,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl RefreshToken {
    /// Create a record for a freshly generated opaque value.
    pub fn new(identity_id: Uuid, token_value: &str, expiry_days: i64) -> Self {
        let now = Utc::now();
        Self {
            token_id: Uuid::new_v4(),
            identity_id,
            token_hash_text: Self::hash_value(token_value),
            expiry_utc: now + Duration::days(expiry_days),
            created_utc: now,
        }
    }

    /// SHA-256 of the opaque token value, hex-encoded.
    pub fn hash_value(token_value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token_value.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_utc <= Utc::now()
    }
}
