//! Token issuance: short-lived signed access tokens paired with opaque,
//! store-backed refresh tokens.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::error::AuthError;
use crate::models::{Identity, RefreshToken};
use crate::services::jwt::JwtSigner;
use crate::services::store::{CredentialStore, RefreshTokenStore};

/// Token payload returned to the client on login, registration and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl TokenPair {
    fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Issues, rotates and revokes token pairs for identities.
#[derive(Clone)]
pub struct TokenIssuer {
    jwt: JwtSigner,
    sessions: Arc<dyn RefreshTokenStore>,
    identities: Arc<dyn CredentialStore>,
    refresh_token_expiry_days: i64,
}

impl TokenIssuer {
    pub fn new(
        jwt: JwtSigner,
        sessions: Arc<dyn RefreshTokenStore>,
        identities: Arc<dyn CredentialStore>,
        refresh_token_expiry_days: i64,
    ) -> Self {
        Self {
            jwt,
            sessions,
            identities,
            refresh_token_expiry_days,
        }
    }

    pub fn jwt(&self) -> &JwtSigner {
        &self.jwt
    }

    /// Issue a fresh access+refresh pair for the identity. The refresh
    /// value is stored hashed; the plaintext exists only in the response.
    pub async fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let access_token = self.jwt.issue_access_token(identity)?;

        let refresh_value = generate_refresh_value();
        let record = RefreshToken::new(
            identity.identity_id,
            &refresh_value,
            self.refresh_token_expiry_days,
        );
        self.sessions.insert(&record).await?;

        Ok(TokenPair::new(
            access_token,
            refresh_value,
            self.jwt.access_token_expiry_seconds(),
        ))
    }

    /// Rotate a presented refresh token: the old record is consumed and a
    /// fresh pair issued for its owner, atomically at the store.
    ///
    /// Unknown, expired, already-rotated values and values owned by a
    /// missing or deactivated identity all fail the same way.
    pub async fn rotate_refresh(
        &self,
        presented: &str,
    ) -> Result<(Identity, TokenPair), AuthError> {
        let presented_hash = RefreshToken::hash_value(presented);

        let current = self
            .sessions
            .find_by_hash(&presented_hash)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        if current.is_expired() {
            // Lazy cleanup; the sweep would catch it eventually.
            self.sessions.delete_by_hash(&presented_hash).await?;
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let identity = self
            .identities
            .find_identity_by_id(current.identity_id)
            .await?
            .filter(|identity| identity.is_active)
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let access_token = self.jwt.issue_access_token(&identity)?;
        let refresh_value = generate_refresh_value();
        let replacement = RefreshToken::new(
            identity.identity_id,
            &refresh_value,
            self.refresh_token_expiry_days,
        );

        // A concurrent rotation of the same value loses here: the store
        // consumes the old row exactly once.
        if self
            .sessions
            .rotate(&presented_hash, &replacement)
            .await?
            .is_none()
        {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        tracing::info!(identity_id = %identity.identity_id, "refresh token rotated");

        Ok((
            identity,
            TokenPair::new(
                access_token,
                refresh_value,
                self.jwt.access_token_expiry_seconds(),
            ),
        ))
    }

    /// Global logout: delete every refresh token the identity holds.
    /// Already-issued access tokens stay valid until natural expiry.
    pub async fn revoke_all(&self, identity_id: uuid::Uuid) -> Result<u64, AuthError> {
        let revoked = self.sessions.delete_all_for_identity(identity_id).await?;
        tracing::info!(identity_id = %identity_id, revoked, "all refresh tokens revoked");
        Ok(revoked)
    }

    /// Current-device logout: delete one refresh token. No-op when the
    /// value is unknown.
    pub async fn revoke_one(&self, presented: &str) -> Result<(), AuthError> {
        self.sessions
            .delete_by_hash(&RefreshToken::hash_value(presented))
            .await
    }

    /// Delete refresh tokens past their absolute expiry.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        self.sessions.delete_expired().await
    }
}

/// 32 random bytes, hex-encoded: unguessable and URL-safe.
fn generate_refresh_value() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
