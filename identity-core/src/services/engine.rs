//! Request-flow orchestration: login, registration, logout, refresh,
//! password reset and change.
//!
//! Every collaborator is injected; the engine holds no mutable state of its
//! own. Each method is one short-lived request/response unit.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::credential::Credential;
use crate::error::AuthError;
use crate::models::{AuditAction, AuditEvent, Identity, IdentitySummary, IdentityUpdate, NewIdentity, NewTenant, TenantSummary};
use crate::services::audit::AuditSink;
use crate::services::delivery::{CodeChannel, CodeSender};
use crate::services::reset::ResetCodeService;
use crate::services::store::CredentialStore;
use crate::services::token::{TokenIssuer, TokenPair};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Per-request context supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
}

/// Registration input: the new account's holder plus their company.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub company_name: String,
    pub company_type: String,
    pub company_sector: String,
    pub company_employees_number: Option<String>,
    pub company_address: Option<String>,
    pub company_city: Option<String>,
    pub company_zipcode: Option<String>,
    pub company_country: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub identity: IdentitySummary,
    pub tenant: TenantSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub identity: IdentitySummary,
    pub tenant: Option<TenantSummary>,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub identity: IdentitySummary,
    pub tenant: Option<TenantSummary>,
}

/// How a logout applies.
#[derive(Debug, Clone)]
pub enum LogoutScope {
    /// Revoke every refresh token the identity holds.
    AllDevices(Uuid),
    /// Revoke only the presented refresh token.
    CurrentDevice(String),
}

/// Orchestrates the credential/token lifecycle flows.
#[derive(Clone)]
pub struct AuthEngine {
    store: Arc<dyn CredentialStore>,
    codes: ResetCodeService,
    tokens: TokenIssuer,
    sender: Arc<dyn CodeSender>,
    audit: Arc<dyn AuditSink>,
}

impl AuthEngine {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codes: ResetCodeService,
        tokens: TokenIssuer,
        sender: Arc<dyn CodeSender>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            codes,
            tokens,
            sender,
            audit,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Authenticate a credential+password pair and issue a token pair.
    ///
    /// "No such account" and "wrong password" are indistinguishable to the
    /// caller.
    pub async fn login(
        &self,
        credential: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<LoginOutcome, AuthError> {
        let credential = Credential::classify(credential).ok_or_else(|| {
            AuthError::Validation("credential is not a valid email or phone".to_string())
        })?;

        let identity = self
            .store
            .find_active_by_credential(&credential)
            .await?
            .ok_or(AuthError::AuthenticationFailed)?;

        let supplied = Password::new(password.to_string());
        let stored = PasswordHashString::new(identity.password_hash.clone());
        if !verify_password(&supplied, &stored) {
            return Err(AuthError::AuthenticationFailed);
        }

        // Stamping is best-effort; a failed stamp must not fail the login.
        if let Err(e) = self.store.record_login(identity.identity_id).await {
            tracing::warn!(error = %e, identity_id = %identity.identity_id, "failed to stamp last login");
        }

        let tokens = self.tokens.issue_pair(&identity).await?;
        let tenant = self.load_tenant(&identity).await?;

        tracing::info!(identity_id = %identity.identity_id, "user logged in");
        self.record_audit(
            AuditEvent::auth(
                AuditAction::UserLogin,
                "user logged in",
                identity.tenant_id,
                Some(identity.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", identity.identity_id),
        )
        .await;

        Ok(LoginOutcome {
            identity: identity.summary(),
            tenant: tenant.map(|t| t.summary()),
            tokens,
        })
    }

    /// Register a company and its first user as one atomic unit.
    pub async fn register(
        &self,
        req: RegisterRequest,
        ctx: &RequestContext,
    ) -> Result<RegistrationOutcome, AuthError> {
        let email = match Credential::classify(&req.email) {
            Some(Credential::Email(email)) => email,
            _ => return Err(AuthError::Validation("email is not valid".to_string())),
        };
        let phone = match Credential::classify(&req.phone) {
            Some(Credential::Phone(phone)) => phone,
            _ => return Err(AuthError::Validation("phone is not valid".to_string())),
        };

        let password_hash = hash_password(&Password::new(req.password))?.into_string();

        let new_tenant = NewTenant {
            name: req.company_name,
            tenant_type: req.company_type,
            sector: req.company_sector,
            employees_number: req.company_employees_number,
            address: req.company_address,
            city: req.company_city,
            zipcode: req.company_zipcode,
            country: req.company_country,
        };
        let new_identity = NewIdentity {
            first_name: req.first_name,
            last_name: req.last_name,
            email,
            phone,
            password_hash,
            tenant_id: None, // bound by the store inside the transaction
            is_superadmin: false,
        };

        let (tenant, identity) = self
            .store
            .register_tenant_with_identity(new_tenant, new_identity)
            .await?;

        tracing::info!(
            identity_id = %identity.identity_id,
            tenant_id = %tenant.tenant_id,
            "user registered"
        );
        self.record_audit(
            AuditEvent::auth(
                AuditAction::UserRegistered,
                "tenant and first user created",
                Some(tenant.tenant_id),
                Some(identity.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", identity.identity_id),
        )
        .await;

        Ok(RegistrationOutcome {
            identity: identity.summary(),
            tenant: tenant.summary(),
        })
    }

    /// Rotate a refresh token into a fresh pair.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<TokenPair, AuthError> {
        let (identity, pair) = self.tokens.rotate_refresh(refresh_token).await?;

        self.record_audit(
            AuditEvent::auth(
                AuditAction::TokenRefreshed,
                "refresh token rotated",
                identity.tenant_id,
                Some(identity.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", identity.identity_id),
        )
        .await;

        Ok(pair)
    }

    /// Log out globally or for the current device only.
    pub async fn logout(&self, scope: LogoutScope, ctx: &RequestContext) -> Result<(), AuthError> {
        let actor = match scope {
            LogoutScope::AllDevices(identity_id) => {
                self.tokens.revoke_all(identity_id).await?;
                Some(identity_id)
            }
            LogoutScope::CurrentDevice(refresh_token) => {
                self.tokens.revoke_one(&refresh_token).await?;
                None
            }
        };

        self.record_audit(AuditEvent::auth(
            AuditAction::UserLogout,
            "user logged out",
            None,
            actor,
            ctx.ip_address.clone(),
        ))
        .await;

        Ok(())
    }

    /// Start a password reset for whoever holds the credential.
    ///
    /// Always succeeds from the caller's point of view, whether or not the
    /// credential maps to an account; only infrastructure failures surface.
    pub async fn request_password_reset(
        &self,
        credential: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let Some(credential) = Credential::classify(credential) else {
            return Ok(());
        };

        let Some(identity) = self.store.find_active_by_credential(&credential).await? else {
            tracing::info!("password reset requested for unknown credential");
            return Ok(());
        };

        // Codes are keyed by the identity's email, whichever credential was
        // presented; delivery follows the presented credential.
        let code = self.codes.issue(&identity.email).await?;
        let channel = if credential.is_email() {
            CodeChannel::Email
        } else {
            CodeChannel::Sms
        };

        if let Err(e) = self.sender.send_code(&identity, &code, channel).await {
            tracing::warn!(error = %e, identity_id = %identity.identity_id, "reset code delivery failed");
        }

        self.record_audit(
            AuditEvent::auth(
                AuditAction::PasswordResetRequested,
                "password reset requested",
                identity.tenant_id,
                Some(identity.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", identity.identity_id),
        )
        .await;

        Ok(())
    }

    /// Complete a reset: consume the code, rehash, revoke all sessions.
    ///
    /// Wrong code, expired code and unknown credential all fail with the
    /// same `InvalidOrExpiredCode`.
    pub async fn reset_password(
        &self,
        credential: &str,
        code: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let credential =
            Credential::classify(credential).ok_or(AuthError::InvalidOrExpiredCode)?;

        let identity = self
            .store
            .find_active_by_credential(&credential)
            .await?
            .ok_or(AuthError::InvalidOrExpiredCode)?;

        if !self.codes.verify_and_consume(&identity.email, code).await? {
            return Err(AuthError::InvalidOrExpiredCode);
        }

        self.persist_new_password(&identity, new_password).await?;

        // The consumed code proved control of the credential, not of any
        // existing session: drop them all.
        self.tokens.revoke_all(identity.identity_id).await?;

        tracing::info!(identity_id = %identity.identity_id, "password reset completed");
        self.record_audit(
            AuditEvent::auth(
                AuditAction::PasswordReset,
                "password reset completed",
                identity.tenant_id,
                Some(identity.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", identity.identity_id),
        )
        .await;

        Ok(())
    }

    /// Issue a change-password code for an already-authenticated identity.
    /// The code always goes to the identity's stored email.
    pub async fn request_password_change(
        &self,
        identity: &Identity,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let code = self.codes.issue(&identity.email).await?;

        if let Err(e) = self
            .sender
            .send_code(identity, &code, CodeChannel::Email)
            .await
        {
            tracing::warn!(error = %e, identity_id = %identity.identity_id, "change code delivery failed");
        }

        self.record_audit(
            AuditEvent::auth(
                AuditAction::PasswordChangeRequested,
                "password change requested",
                identity.tenant_id,
                Some(identity.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", identity.identity_id),
        )
        .await;

        Ok(())
    }

    /// Change the password of an authenticated identity using a code.
    pub async fn change_password_with_code(
        &self,
        identity: &Identity,
        code: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        if !self.codes.verify_and_consume(&identity.email, code).await? {
            return Err(AuthError::InvalidOrExpiredCode);
        }

        self.persist_new_password(identity, new_password).await?;
        self.audit_password_changed(identity, ctx).await;
        Ok(())
    }

    /// Change the password of an authenticated identity by proving the
    /// current one.
    pub async fn change_password_with_current(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        let supplied = Password::new(current_password.to_string());
        let stored = PasswordHashString::new(identity.password_hash.clone());
        if !verify_password(&supplied, &stored) {
            return Err(AuthError::AuthenticationFailed);
        }

        self.persist_new_password(identity, new_password).await?;
        self.audit_password_changed(identity, ctx).await;
        Ok(())
    }

    /// Profile view: identity summary plus its tenant, if any.
    pub async fn profile(&self, identity: &Identity) -> Result<ProfileView, AuthError> {
        let tenant = self.load_tenant(identity).await?;
        Ok(ProfileView {
            identity: identity.summary(),
            tenant: tenant.map(|t| t.summary()),
        })
    }

    /// Partial profile update for an authenticated identity.
    pub async fn update_profile(
        &self,
        identity: &Identity,
        changes: IdentityUpdate,
        ctx: &RequestContext,
    ) -> Result<IdentitySummary, AuthError> {
        let mut changes = changes;
        if let Some(raw) = changes.phone.take() {
            changes.phone = match Credential::classify(&raw) {
                Some(Credential::Phone(phone)) => Some(phone),
                _ => return Err(AuthError::Validation("phone is not valid".to_string())),
            };
        }

        let updated = self
            .store
            .update_identity(identity.identity_id, changes)
            .await?;

        self.record_audit(
            AuditEvent::auth(
                AuditAction::ProfileUpdated,
                "profile updated",
                updated.tenant_id,
                Some(updated.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", updated.identity_id),
        )
        .await;

        Ok(updated.summary())
    }

    /// Periodic maintenance: drop expired reset codes and refresh tokens.
    pub async fn sweep_expired(&self) -> Result<(u64, u64), AuthError> {
        let codes = self.codes.sweep_expired().await?;
        let tokens = self.tokens.sweep_expired().await?;
        Ok((codes, tokens))
    }

    async fn load_tenant(
        &self,
        identity: &Identity,
    ) -> Result<Option<crate::models::Tenant>, AuthError> {
        match identity.tenant_id {
            Some(tenant_id) => self.store.find_tenant_by_id(tenant_id).await,
            None => Ok(None),
        }
    }

    async fn persist_new_password(
        &self,
        identity: &Identity,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let password_hash = hash_password(&Password::new(new_password.to_string()))?.into_string();
        self.store
            .update_identity(
                identity.identity_id,
                IdentityUpdate {
                    password_hash: Some(password_hash),
                    ..IdentityUpdate::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn audit_password_changed(&self, identity: &Identity, ctx: &RequestContext) {
        tracing::info!(identity_id = %identity.identity_id, "password changed");
        self.record_audit(
            AuditEvent::auth(
                AuditAction::PasswordChanged,
                "password changed",
                identity.tenant_id,
                Some(identity.identity_id),
                ctx.ip_address.clone(),
            )
            .with_subject("identity", identity.identity_id),
        )
        .await;
    }

    /// Best-effort audit: a sink outage never fails the flow.
    async fn record_audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(event).await {
            tracing::error!(error = %e, "audit sink failure");
        }
    }
}
