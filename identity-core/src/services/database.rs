//! PostgreSQL persistence for the identity core.
//!
//! Runtime-checked sqlx queries over a `PgPool`. Personal-data fields go
//! through the [`FieldCodec`] at this boundary: encoded on write, decoded
//! on read under the store's configured [`LegacyFieldPolicy`].

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use uuid::Uuid;

use async_trait::async_trait;

use crate::config::DatabaseConfig;
use crate::credential::Credential;
use crate::crypto::{FieldCodec, FieldDecodeError, LegacyFieldPolicy};
use crate::error::AuthError;
use crate::models::{
    Identity, IdentityUpdate, NewIdentity, NewTenant, RefreshToken, ResetCode, Tenant,
};
use crate::services::store::{CredentialStore, RefreshTokenStore, ResetCodeRepo};

/// Build a connection pool with a bounded acquire timeout, so a saturated
/// or unreachable database surfaces as an infrastructure failure instead
/// of blocking a request indefinitely.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, AuthError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect(&config.url)
        .await
        .map_err(|e| AuthError::Infrastructure(anyhow::anyhow!("database connect failed: {e}")))
}

/// PostgreSQL database wrapper implementing the store traits.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    codec: FieldCodec,
    legacy_policy: LegacyFieldPolicy,
}

impl Database {
    pub fn new(pool: PgPool, codec: FieldCodec, legacy_policy: LegacyFieldPolicy) -> Self {
        Self {
            pool,
            codec,
            legacy_policy,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "database health check failed");
                AuthError::Infrastructure(anyhow::anyhow!("database health check failed: {e}"))
            })?;
        Ok(())
    }

    fn decode_field(&self, stored: &str, column: &'static str) -> Result<String, AuthError> {
        self.codec
            .decode_with_policy(stored, self.legacy_policy)
            .map_err(|e| match e {
                FieldDecodeError::NotEncoded => {
                    AuthError::Infrastructure(anyhow::anyhow!("{column}: unencrypted legacy row rejected by policy"))
                }
                other => {
                    tracing::error!(column, error = %other, "field decode failed");
                    AuthError::Infrastructure(anyhow::anyhow!("{column}: {other}"))
                }
            })
    }

    fn decode_opt_field(
        &self,
        stored: Option<&str>,
        column: &'static str,
    ) -> Result<Option<String>, AuthError> {
        stored.map(|v| self.decode_field(v, column)).transpose()
    }

    fn encode_field(&self, plain: &str) -> Result<String, AuthError> {
        self.codec
            .encode(plain)
            .map_err(|e| AuthError::Infrastructure(anyhow::anyhow!("field encode failed: {e}")))
    }

    fn encode_opt_field(&self, plain: Option<&str>) -> Result<Option<String>, AuthError> {
        plain.map(|v| self.encode_field(v)).transpose()
    }

    fn identity_from_row(&self, row: IdentityRow) -> Result<Identity, AuthError> {
        Ok(Identity {
            identity_id: row.identity_id,
            first_name: self.decode_field(&row.first_name, "identities.first_name")?,
            last_name: self.decode_field(&row.last_name, "identities.last_name")?,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            tenant_id: row.tenant_id,
            is_active: row.is_active,
            is_superadmin: row.is_superadmin,
            email_verified_utc: row.email_verified_utc,
            phone_verified_utc: row.phone_verified_utc,
            last_login_utc: row.last_login_utc,
            created_utc: row.created_utc,
        })
    }

    fn tenant_from_row(&self, row: TenantRow) -> Result<Tenant, AuthError> {
        Ok(Tenant {
            tenant_id: row.tenant_id,
            name: self.decode_field(&row.name, "tenants.name")?,
            tenant_type: self.decode_field(&row.tenant_type, "tenants.tenant_type")?,
            sector: self.decode_field(&row.sector, "tenants.sector")?,
            employees_number: self
                .decode_opt_field(row.employees_number.as_deref(), "tenants.employees_number")?,
            address: self.decode_opt_field(row.address.as_deref(), "tenants.address")?,
            city: self.decode_opt_field(row.city.as_deref(), "tenants.city")?,
            zipcode: row.zipcode,
            country: self.decode_field(&row.country, "tenants.country")?,
            is_active: row.is_active,
            created_utc: row.created_utc,
        })
    }
}

/// Raw identity row as stored: name fields still encoded.
#[derive(Debug, FromRow)]
struct IdentityRow {
    identity_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    password_hash: String,
    tenant_id: Option<Uuid>,
    is_active: bool,
    is_superadmin: bool,
    email_verified_utc: Option<DateTime<Utc>>,
    phone_verified_utc: Option<DateTime<Utc>>,
    last_login_utc: Option<DateTime<Utc>>,
    created_utc: DateTime<Utc>,
}

/// Raw tenant row as stored: classification fields still encoded
/// (zipcode excepted).
#[derive(Debug, FromRow)]
struct TenantRow {
    tenant_id: Uuid,
    name: String,
    tenant_type: String,
    sector: String,
    employees_number: Option<String>,
    address: Option<String>,
    city: Option<String>,
    zipcode: Option<String>,
    country: String,
    is_active: bool,
    created_utc: DateTime<Utc>,
}

/// Map a storage error, surfacing uniqueness and foreign-key violations as
/// their typed business failures.
fn map_insert_err(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            // unique_violation: email, phone or token value already present
            Some("23505") => return AuthError::DuplicateCredential,
            // foreign_key_violation: tenant reference does not resolve
            Some("23503") => return AuthError::TenantMissing,
            _ => {}
        }
    }
    AuthError::Infrastructure(anyhow::anyhow!(e))
}

fn map_db_err(e: sqlx::Error) -> AuthError {
    AuthError::Infrastructure(anyhow::anyhow!(e))
}

const INSERT_IDENTITY: &str = r#"
    INSERT INTO identities (
        identity_id, first_name, last_name, email, phone, password_hash,
        tenant_id, is_active, is_superadmin, email_verified_utc,
        phone_verified_utc, last_login_utc, created_utc
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
"#;

const INSERT_TENANT: &str = r#"
    INSERT INTO tenants (
        tenant_id, name, tenant_type, sector, employees_number, address,
        city, zipcode, country, is_active, created_utc
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

#[async_trait]
impl CredentialStore for Database {
    async fn find_active_by_credential(
        &self,
        credential: &Credential,
    ) -> Result<Option<Identity>, AuthError> {
        let query = match credential {
            Credential::Email(_) => {
                "SELECT * FROM identities WHERE is_active = TRUE AND email = $1"
            }
            Credential::Phone(_) => {
                "SELECT * FROM identities WHERE is_active = TRUE AND phone = $1"
            }
        };

        let row = sqlx::query_as::<_, IdentityRow>(query)
            .bind(credential.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(|r| self.identity_from_row(r)).transpose()
    }

    async fn find_identity_by_id(&self, identity_id: Uuid) -> Result<Option<Identity>, AuthError> {
        let row =
            sqlx::query_as::<_, IdentityRow>("SELECT * FROM identities WHERE identity_id = $1")
                .bind(identity_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;

        row.map(|r| self.identity_from_row(r)).transpose()
    }

    async fn find_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AuthError> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(|r| self.tenant_from_row(r)).transpose()
    }

    async fn create_identity(&self, new_identity: NewIdentity) -> Result<Identity, AuthError> {
        let identity = new_identity.into_identity();

        sqlx::query(INSERT_IDENTITY)
            .bind(identity.identity_id)
            .bind(self.encode_field(&identity.first_name)?)
            .bind(self.encode_field(&identity.last_name)?)
            .bind(&identity.email)
            .bind(&identity.phone)
            .bind(&identity.password_hash)
            .bind(identity.tenant_id)
            .bind(identity.is_active)
            .bind(identity.is_superadmin)
            .bind(identity.email_verified_utc)
            .bind(identity.phone_verified_utc)
            .bind(identity.last_login_utc)
            .bind(identity.created_utc)
            .execute(&self.pool)
            .await
            .map_err(map_insert_err)?;

        Ok(identity)
    }

    async fn register_tenant_with_identity(
        &self,
        new_tenant: NewTenant,
        new_identity: NewIdentity,
    ) -> Result<(Tenant, Identity), AuthError> {
        let tenant = new_tenant.into_tenant();
        let mut new_identity = new_identity;
        new_identity.tenant_id = Some(tenant.tenant_id);
        let identity = new_identity.into_identity();

        // Both inserts in one transaction: a failed identity insert rolls
        // the tenant back, leaving no orphan.
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query(INSERT_TENANT)
            .bind(tenant.tenant_id)
            .bind(self.encode_field(&tenant.name)?)
            .bind(self.encode_field(&tenant.tenant_type)?)
            .bind(self.encode_field(&tenant.sector)?)
            .bind(self.encode_opt_field(tenant.employees_number.as_deref())?)
            .bind(self.encode_opt_field(tenant.address.as_deref())?)
            .bind(self.encode_opt_field(tenant.city.as_deref())?)
            .bind(&tenant.zipcode)
            .bind(self.encode_field(&tenant.country)?)
            .bind(tenant.is_active)
            .bind(tenant.created_utc)
            .execute(&mut *tx)
            .await
            .map_err(map_insert_err)?;

        sqlx::query(INSERT_IDENTITY)
            .bind(identity.identity_id)
            .bind(self.encode_field(&identity.first_name)?)
            .bind(self.encode_field(&identity.last_name)?)
            .bind(&identity.email)
            .bind(&identity.phone)
            .bind(&identity.password_hash)
            .bind(identity.tenant_id)
            .bind(identity.is_active)
            .bind(identity.is_superadmin)
            .bind(identity.email_verified_utc)
            .bind(identity.phone_verified_utc)
            .bind(identity.last_login_utc)
            .bind(identity.created_utc)
            .execute(&mut *tx)
            .await
            .map_err(map_insert_err)?;

        tx.commit().await.map_err(map_db_err)?;

        Ok((tenant, identity))
    }

    async fn update_identity(
        &self,
        identity_id: Uuid,
        changes: IdentityUpdate,
    ) -> Result<Identity, AuthError> {
        let first_name = self.encode_opt_field(changes.first_name.as_deref())?;
        let last_name = self.encode_opt_field(changes.last_name.as_deref())?;

        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            UPDATE identities SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                password_hash = COALESCE($5, password_hash),
                is_active = COALESCE($6, is_active)
            WHERE identity_id = $1
            RETURNING *
            "#,
        )
        .bind(identity_id)
        .bind(first_name)
        .bind(last_name)
        .bind(changes.phone)
        .bind(changes.password_hash)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_insert_err)?
        .ok_or(AuthError::NotFound("identity"))?;

        self.identity_from_row(row)
    }

    async fn record_login(&self, identity_id: Uuid) -> Result<(), AuthError> {
        sqlx::query("UPDATE identities SET last_login_utc = NOW() WHERE identity_id = $1")
            .bind(identity_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}

const INSERT_REFRESH_TOKEN: &str = r#"
    INSERT INTO refresh_tokens (token_id, identity_id, token_hash_text, expiry_utc, created_utc)
    VALUES ($1, $2, $3, $4, $5)
"#;

#[async_trait]
impl RefreshTokenStore for Database {
    async fn insert(&self, token: &RefreshToken) -> Result<(), AuthError> {
        sqlx::query(INSERT_REFRESH_TOKEN)
            .bind(token.token_id)
            .bind(token.identity_id)
            .bind(&token.token_hash_text)
            .bind(token.expiry_utc)
            .bind(token.created_utc)
            .execute(&self.pool)
            .await
            .map_err(map_insert_err)?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AuthError> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash_text = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn rotate(
        &self,
        presented_hash: &str,
        replacement: &RefreshToken,
    ) -> Result<Option<RefreshToken>, AuthError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        // Consume the old row first; the expiry guard makes an expired
        // token unusable even if the sweep has not run yet.
        let consumed = sqlx::query_as::<_, RefreshToken>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token_hash_text = $1 AND expiry_utc > NOW()
            RETURNING *
            "#,
        )
        .bind(presented_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let Some(consumed) = consumed else {
            // Nothing to rotate; the transaction drops without effect.
            return Ok(None);
        };

        sqlx::query(INSERT_REFRESH_TOKEN)
            .bind(replacement.token_id)
            .bind(replacement.identity_id)
            .bind(&replacement.token_hash_text)
            .bind(replacement.expiry_utc)
            .bind(replacement.created_utc)
            .execute(&mut *tx)
            .await
            .map_err(map_insert_err)?;

        tx.commit().await.map_err(map_db_err)?;

        Ok(Some(consumed))
    }

    async fn delete_by_hash(&self, token_hash: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash_text = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete_all_for_identity(&self, identity_id: Uuid) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE identity_id = $1")
            .bind(identity_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expiry_utc <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ResetCodeRepo for Database {
    async fn upsert(&self, code: &ResetCode) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO reset_codes (credential_key, code_hash, issued_utc)
            VALUES ($1, $2, $3)
            ON CONFLICT (credential_key)
            DO UPDATE SET code_hash = EXCLUDED.code_hash, issued_utc = EXCLUDED.issued_utc
            "#,
        )
        .bind(&code.credential_key)
        .bind(&code.code_hash)
        .bind(code.issued_utc)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn find(&self, credential_key: &str) -> Result<Option<ResetCode>, AuthError> {
        sqlx::query_as::<_, ResetCode>("SELECT * FROM reset_codes WHERE credential_key = $1")
            .bind(credential_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn delete(&self, credential_key: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM reset_codes WHERE credential_key = $1")
            .bind(credential_key)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM reset_codes WHERE issued_utc < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected())
    }
}
