//! Identity model - tenant-scoped user accounts keyed by email or phone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity entity. Personal-name fields are plaintext here; the store
/// encrypts them at rest and decodes them on read.
#[derive(Debug, Clone)]
pub struct Identity {
    pub identity_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Normalized (trimmed, lower-cased) email. Globally unique.
    pub email: String,
    /// Normalized digits-only phone. Globally unique.
    pub phone: String,
    pub password_hash: String,
    pub tenant_id: Option<Uuid>,
    pub is_active: bool,
    pub is_superadmin: bool,
    pub email_verified_utc: Option<DateTime<Utc>>,
    pub phone_verified_utc: Option<DateTime<Utc>>,
    pub last_login_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl Identity {
    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.identity_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            email_verified_utc: self.email_verified_utc,
            phone_verified_utc: self.phone_verified_utc,
        }
    }
}

/// Fields for creating an identity. Email and phone must already be
/// normalized; `password_hash` is a finished digest, never a plaintext.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub tenant_id: Option<Uuid>,
    pub is_superadmin: bool,
}

impl NewIdentity {
    /// Materialize into a full entity with generated id and timestamps.
    pub fn into_identity(self) -> Identity {
        Identity {
            identity_id: Uuid::new_v4(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            tenant_id: self.tenant_id,
            is_active: true,
            is_superadmin: self.is_superadmin,
            email_verified_utc: None,
            phone_verified_utc: None,
            last_login_utc: None,
            created_utc: Utc::now(),
        }
    }
}

/// Partial update: only `Some` fields are changed.
#[derive(Debug, Clone, Default)]
pub struct IdentityUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

/// Identity view for API responses (no secrets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub email_verified_utc: Option<DateTime<Utc>>,
    pub phone_verified_utc: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_identity_starts_active_and_unverified() {
        let identity = NewIdentity {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "0600000000".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            tenant_id: None,
            is_superadmin: false,
        }
        .into_identity();

        assert!(identity.is_active);
        assert!(identity.email_verified_utc.is_none());
        assert!(identity.last_login_utc.is_none());
    }

    #[test]
    fn summary_carries_no_password_material() {
        let identity = NewIdentity {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "0600000000".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            tenant_id: None,
            is_superadmin: false,
        }
        .into_identity();

        let json = serde_json::to_string(&identity.summary()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("ada@example.com"));
    }
}
