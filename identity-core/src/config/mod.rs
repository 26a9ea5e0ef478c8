use serde::Deserialize;
use std::env;

use crate::error::AuthError;

/// Configuration for the identity core, loaded from the environment.
///
/// Every value the engine needs is passed in explicitly from here; the core
/// never reads ambient state at call time.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub token: TokenConfig,
    pub reset: ResetConfig,
    pub encryption: EncryptionConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection; a timeout surfaces
    /// as an infrastructure failure, never a silent retry.
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub code_validity_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    /// 32-byte AES key, hex-encoded (64 characters).
    pub field_key_hex: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from_email: String,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AuthError::Infrastructure(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = IdentityConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("identity-core"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                acquire_timeout_seconds: parse_env(
                    "DATABASE_ACQUIRE_TIMEOUT_SECONDS",
                    Some("5"),
                    is_prod,
                )?,
            },
            token: TokenConfig {
                secret: get_env("TOKEN_SECRET", None, is_prod)?,
                access_token_expiry_minutes: parse_env(
                    "ACCESS_TOKEN_EXPIRY_MINUTES",
                    Some("15"),
                    is_prod,
                )?,
                refresh_token_expiry_days: parse_env(
                    "REFRESH_TOKEN_EXPIRY_DAYS",
                    Some("30"),
                    is_prod,
                )?,
            },
            reset: ResetConfig {
                code_validity_minutes: parse_env(
                    "RESET_CODE_VALIDITY_MINUTES",
                    Some("15"),
                    is_prod,
                )?,
            },
            encryption: EncryptionConfig {
                field_key_hex: get_env("FIELD_ENCRYPTION_KEY", None, is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                user: get_env("SMTP_USER", None, is_prod)?,
                password: get_env("SMTP_PASSWORD", None, is_prod)?,
                from_email: get_env("SMTP_FROM_EMAIL", None, is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.token.access_token_expiry_minutes <= 0 {
            return Err(AuthError::Infrastructure(anyhow::anyhow!(
                "ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.token.refresh_token_expiry_days <= 0 {
            return Err(AuthError::Infrastructure(anyhow::anyhow!(
                "REFRESH_TOKEN_EXPIRY_DAYS must be positive"
            )));
        }

        if self.reset.code_validity_minutes <= 0 {
            return Err(AuthError::Infrastructure(anyhow::anyhow!(
                "RESET_CODE_VALIDITY_MINUTES must be positive"
            )));
        }

        if self.encryption.field_key_hex.trim().len() != 64 {
            return Err(AuthError::Infrastructure(anyhow::anyhow!(
                "FIELD_ENCRYPTION_KEY must be 64 hex characters (32 bytes)"
            )));
        }

        if self.environment == Environment::Prod && self.token.secret.len() < 32 {
            return Err(AuthError::Infrastructure(anyhow::anyhow!(
                "TOKEN_SECRET must be at least 32 characters in production"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AuthError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AuthError::Infrastructure(anyhow::anyhow!(
                    "{key} is required in production but not set"
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AuthError::Infrastructure(anyhow::anyhow!(
                    "{key} is required but not set"
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AuthError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e: T::Err| {
        AuthError::Infrastructure(anyhow::anyhow!("{key} is not parseable: {e}"))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
