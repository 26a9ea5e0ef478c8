//! In-memory store implementations for tests and examples.
//!
//! Same contracts as the Postgres store, including uniqueness enforcement
//! and atomic register/rotate, but backed by mutex-guarded maps. Locks are
//! never held across awaits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::credential::Credential;
use crate::error::AuthError;
use crate::models::{
    Identity, IdentityUpdate, NewIdentity, NewTenant, RefreshToken, ResetCode, Tenant,
};
use crate::services::store::{CredentialStore, RefreshTokenStore, ResetCodeRepo};

#[derive(Default)]
pub struct MemoryStore {
    identities: Mutex<HashMap<Uuid, Identity>>,
    tenants: Mutex<HashMap<Uuid, Tenant>>,
    refresh_tokens: Mutex<HashMap<String, RefreshToken>>,
    reset_codes: Mutex<HashMap<String, ResetCode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity_count(&self) -> usize {
        self.identities.lock().unwrap().len()
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.lock().unwrap().len()
    }

    pub fn refresh_token_count_for(&self, identity_id: Uuid) -> usize {
        self.refresh_tokens
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.identity_id == identity_id)
            .count()
    }

    fn credential_conflict(identities: &HashMap<Uuid, Identity>, email: &str, phone: &str) -> bool {
        identities
            .values()
            .any(|existing| existing.email == email || existing.phone == phone)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_active_by_credential(
        &self,
        credential: &Credential,
    ) -> Result<Option<Identity>, AuthError> {
        let identities = self.identities.lock().unwrap();
        let found = identities
            .values()
            .find(|identity| {
                identity.is_active
                    && match credential {
                        Credential::Email(email) => identity.email == *email,
                        Credential::Phone(phone) => identity.phone == *phone,
                    }
            })
            .cloned();
        Ok(found)
    }

    async fn find_identity_by_id(&self, identity_id: Uuid) -> Result<Option<Identity>, AuthError> {
        Ok(self.identities.lock().unwrap().get(&identity_id).cloned())
    }

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AuthError> {
        Ok(self.tenants.lock().unwrap().get(&tenant_id).cloned())
    }

    async fn create_identity(&self, new_identity: NewIdentity) -> Result<Identity, AuthError> {
        if let Some(tenant_id) = new_identity.tenant_id {
            if !self.tenants.lock().unwrap().contains_key(&tenant_id) {
                return Err(AuthError::TenantMissing);
            }
        }

        let mut identities = self.identities.lock().unwrap();
        if Self::credential_conflict(&identities, &new_identity.email, &new_identity.phone) {
            return Err(AuthError::DuplicateCredential);
        }

        let identity = new_identity.into_identity();
        identities.insert(identity.identity_id, identity.clone());
        Ok(identity)
    }

    async fn register_tenant_with_identity(
        &self,
        new_tenant: NewTenant,
        new_identity: NewIdentity,
    ) -> Result<(Tenant, Identity), AuthError> {
        // Both maps locked for the whole operation: both-or-neither, and a
        // concurrent duplicate registration cannot interleave.
        let mut tenants = self.tenants.lock().unwrap();
        let mut identities = self.identities.lock().unwrap();

        if Self::credential_conflict(&identities, &new_identity.email, &new_identity.phone) {
            return Err(AuthError::DuplicateCredential);
        }

        let tenant = new_tenant.into_tenant();
        let mut new_identity = new_identity;
        new_identity.tenant_id = Some(tenant.tenant_id);
        let identity = new_identity.into_identity();

        tenants.insert(tenant.tenant_id, tenant.clone());
        identities.insert(identity.identity_id, identity.clone());

        Ok((tenant, identity))
    }

    async fn update_identity(
        &self,
        identity_id: Uuid,
        changes: IdentityUpdate,
    ) -> Result<Identity, AuthError> {
        let mut identities = self.identities.lock().unwrap();
        let identity = identities
            .get_mut(&identity_id)
            .ok_or(AuthError::NotFound("identity"))?;

        if let Some(first_name) = changes.first_name {
            identity.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            identity.last_name = last_name;
        }
        if let Some(phone) = changes.phone {
            identity.phone = phone;
        }
        if let Some(password_hash) = changes.password_hash {
            identity.password_hash = password_hash;
        }
        if let Some(is_active) = changes.is_active {
            identity.is_active = is_active;
        }

        Ok(identity.clone())
    }

    async fn record_login(&self, identity_id: Uuid) -> Result<(), AuthError> {
        if let Some(identity) = self.identities.lock().unwrap().get_mut(&identity_id) {
            identity.last_login_utc = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AuthError> {
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(token.token_hash_text.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AuthError> {
        Ok(self.refresh_tokens.lock().unwrap().get(token_hash).cloned())
    }

    async fn rotate(
        &self,
        presented_hash: &str,
        replacement: &RefreshToken,
    ) -> Result<Option<RefreshToken>, AuthError> {
        // One lock across consume + insert mirrors the Postgres transaction.
        let mut tokens = self.refresh_tokens.lock().unwrap();

        let consumed = match tokens.get(presented_hash) {
            Some(existing) if !existing.is_expired() => tokens.remove(presented_hash),
            _ => None,
        };

        if consumed.is_none() {
            return Ok(None);
        }

        tokens.insert(replacement.token_hash_text.clone(), replacement.clone());
        Ok(consumed)
    }

    async fn delete_by_hash(&self, token_hash: &str) -> Result<(), AuthError> {
        self.refresh_tokens.lock().unwrap().remove(token_hash);
        Ok(())
    }

    async fn delete_all_for_identity(&self, identity_id: Uuid) -> Result<u64, AuthError> {
        let mut tokens = self.refresh_tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, token| token.identity_id != identity_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64, AuthError> {
        let mut tokens = self.refresh_tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired());
        Ok((before - tokens.len()) as u64)
    }
}

#[async_trait]
impl ResetCodeRepo for MemoryStore {
    async fn upsert(&self, code: &ResetCode) -> Result<(), AuthError> {
        self.reset_codes
            .lock()
            .unwrap()
            .insert(code.credential_key.clone(), code.clone());
        Ok(())
    }

    async fn find(&self, credential_key: &str) -> Result<Option<ResetCode>, AuthError> {
        Ok(self.reset_codes.lock().unwrap().get(credential_key).cloned())
    }

    async fn delete(&self, credential_key: &str) -> Result<bool, AuthError> {
        Ok(self
            .reset_codes
            .lock()
            .unwrap()
            .remove(credential_key)
            .is_some())
    }

    async fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut codes = self.reset_codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|_, code| code.issued_utc >= cutoff);
        Ok((before - codes.len()) as u64)
    }
}
