//! Audit event model - append-only records handed to the audit sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit action codes emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserRegistered,
    UserLogin,
    UserLogout,
    TokenRefreshed,
    PasswordResetRequested,
    PasswordReset,
    PasswordChangeRequested,
    PasswordChanged,
    ProfileUpdated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "user_registered",
            AuditAction::UserLogin => "user_login",
            AuditAction::UserLogout => "user_logout",
            AuditAction::TokenRefreshed => "token_refreshed",
            AuditAction::PasswordResetRequested => "password_reset_requested",
            AuditAction::PasswordReset => "password_reset",
            AuditAction::PasswordChangeRequested => "password_change_requested",
            AuditAction::PasswordChanged => "password_changed",
            AuditAction::ProfileUpdated => "profile_updated",
        }
    }
}

/// Audit event entity. The core only writes these; it never reads them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    /// Functional universe the event belongs to, e.g. "auth".
    pub universe: String,
    pub action: AuditAction,
    pub module: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub description: String,
    pub tenant_id: Option<Uuid>,
    pub actor_identity_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an auth-universe event for an identity-scoped action.
    pub fn auth(
        action: AuditAction,
        description: impl Into<String>,
        tenant_id: Option<Uuid>,
        actor_identity_id: Option<Uuid>,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            universe: "auth".to_string(),
            action,
            module: "identity-core".to_string(),
            subject_type: None,
            subject_id: None,
            description: description.into(),
            tenant_id,
            actor_identity_id,
            ip_address,
            created_utc: Utc::now(),
        }
    }

    /// Attach the subject record the event is about.
    pub fn with_subject(mut self, subject_type: &str, subject_id: impl ToString) -> Self {
        self.subject_type = Some(subject_type.to_string());
        self.subject_id = Some(subject_id.to_string());
        self
    }
}
