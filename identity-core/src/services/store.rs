//! Storage seams for the engine.
//!
//! Traits so the engine composes against an interface: Postgres in
//! production (`Database`), in-memory for tests (`MemoryStore`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::credential::Credential;
use crate::error::AuthError;
use crate::models::{Identity, IdentityUpdate, NewIdentity, NewTenant, RefreshToken, ResetCode, Tenant};

/// Identity and tenant persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an active identity by normalized credential. Absence is not
    /// an error.
    async fn find_active_by_credential(
        &self,
        credential: &Credential,
    ) -> Result<Option<Identity>, AuthError>;

    async fn find_identity_by_id(&self, identity_id: Uuid) -> Result<Option<Identity>, AuthError>;

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AuthError>;

    /// Insert a new identity. `DuplicateCredential` on an email/phone
    /// conflict, `TenantMissing` when the tenant reference does not resolve.
    async fn create_identity(&self, new_identity: NewIdentity) -> Result<Identity, AuthError>;

    /// Create a tenant and its first identity as one atomic unit:
    /// both-or-neither, no orphan tenant on failure.
    async fn register_tenant_with_identity(
        &self,
        new_tenant: NewTenant,
        new_identity: NewIdentity,
    ) -> Result<(Tenant, Identity), AuthError>;

    /// Partial update; only `Some` fields change. `NotFound` on missing id.
    async fn update_identity(
        &self,
        identity_id: Uuid,
        changes: IdentityUpdate,
    ) -> Result<Identity, AuthError>;

    /// Stamp the last-login timestamp.
    async fn record_login(&self, identity_id: Uuid) -> Result<(), AuthError>;
}

/// Refresh-token persistence.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AuthError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AuthError>;

    /// Atomically consume the presented (unexpired) token and insert its
    /// replacement. Returns the consumed record, or `None` when the
    /// presented hash was absent or expired - in which case nothing is
    /// inserted. Delete and insert are one transaction.
    async fn rotate(
        &self,
        presented_hash: &str,
        replacement: &RefreshToken,
    ) -> Result<Option<RefreshToken>, AuthError>;

    /// Delete a single token. No-op when absent.
    async fn delete_by_hash(&self, token_hash: &str) -> Result<(), AuthError>;

    /// Delete every token owned by the identity; returns how many.
    async fn delete_all_for_identity(&self, identity_id: Uuid) -> Result<u64, AuthError>;

    /// Delete tokens past their absolute expiry; returns how many.
    async fn delete_expired(&self) -> Result<u64, AuthError>;
}

/// Pending reset-code persistence. One row per credential key.
#[async_trait]
pub trait ResetCodeRepo: Send + Sync {
    /// Insert or overwrite the pending code for the key (last write wins).
    async fn upsert(&self, code: &ResetCode) -> Result<(), AuthError>;

    async fn find(&self, credential_key: &str) -> Result<Option<ResetCode>, AuthError>;

    /// Delete the pending code; returns whether a row existed.
    async fn delete(&self, credential_key: &str) -> Result<bool, AuthError>;

    /// Delete every code issued before the cutoff; returns how many.
    async fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError>;
}
