//! Multi-tenant identity and session core.
//!
//! Authenticates users by email-or-phone credential, issues and rotates
//! access/refresh token pairs, runs the one-time reset-code state machine,
//! and emits tenant-scoped audit events over field-encrypted personal data.
//!
//! This crate is the engine only. HTTP routing, request validation,
//! email/SMS transport and audit persistence are collaborators supplied by
//! the embedding service:
//!
//! ```no_run
//! use std::sync::Arc;
//! use identity_core::config::IdentityConfig;
//! use identity_core::crypto::{FieldCodec, LegacyFieldPolicy};
//! use identity_core::services::{
//!     connect_pool, AuthEngine, Database, JwtSigner, ResetCodeService, SmtpCodeSender,
//!     TokenIssuer, TracingAuditSink,
//! };
//!
//! # async fn build() -> Result<AuthEngine, identity_core::error::AuthError> {
//! let config = IdentityConfig::from_env()?;
//! let pool = connect_pool(&config.database).await?;
//! let codec = FieldCodec::from_hex_key(&config.encryption.field_key_hex)
//!     .map_err(|e| identity_core::error::AuthError::Infrastructure(anyhow::anyhow!(e)))?;
//!
//! let db = Arc::new(Database::new(pool, codec, LegacyFieldPolicy::PassThrough));
//! let engine = AuthEngine::new(
//!     db.clone(),
//!     ResetCodeService::new(db.clone(), config.reset.code_validity_minutes),
//!     TokenIssuer::new(
//!         JwtSigner::new(&config.token),
//!         db.clone(),
//!         db,
//!         config.token.refresh_token_expiry_days,
//!     ),
//!     Arc::new(SmtpCodeSender::new(&config.smtp, config.reset.code_validity_minutes)?),
//!     Arc::new(TracingAuditSink),
//! );
//! # Ok(engine)
//! # }
//! ```

pub mod config;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod utils;

pub use credential::Credential;
pub use error::AuthError;
pub use services::{AuthEngine, LoginOutcome, LogoutScope, RegisterRequest, RequestContext, TokenPair};
