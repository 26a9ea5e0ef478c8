use thiserror::Error;

/// Failure taxonomy for the identity core.
///
/// Business-rule failures are typed and final: the core never retries them
/// and callers should not either. `Infrastructure` is the only variant a
/// caller may reasonably retry.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad credential or bad password. Deliberately a single variant so a
    /// caller cannot tell "no such account" apart from "wrong password".
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("email or phone already registered")]
    DuplicateCredential,

    #[error("tenant reference does not resolve")]
    TenantMissing,

    /// Refresh token unknown, already rotated, or past its expiry.
    #[error("invalid or expired refresh token")]
    InvalidOrExpiredToken,

    /// Reset/change code wrong or past the validity window. Deliberately
    /// indistinguishable between the two.
    #[error("invalid or expired verification code")]
    InvalidOrExpiredCode,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] anyhow::Error),
}

impl AuthError {
    /// Whether a caller may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Infrastructure(_))
    }

    /// Message safe to hand to an external boundary. Infrastructure detail
    /// stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "invalid request",
            AuthError::AuthenticationFailed => "authentication failed",
            AuthError::DuplicateCredential => "email or phone already registered",
            AuthError::TenantMissing => "tenant reference does not resolve",
            AuthError::InvalidOrExpiredToken => "invalid or expired refresh token",
            AuthError::InvalidOrExpiredCode => "invalid or expired verification code",
            AuthError::NotFound(_) => "not found",
            AuthError::Infrastructure(_) => "internal server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_infrastructure_is_retryable() {
        assert!(AuthError::Infrastructure(anyhow::anyhow!("db down")).is_retryable());
        assert!(!AuthError::AuthenticationFailed.is_retryable());
        assert!(!AuthError::InvalidOrExpiredCode.is_retryable());
        assert!(!AuthError::DuplicateCredential.is_retryable());
    }

    #[test]
    fn public_message_hides_internal_detail() {
        let err = AuthError::Infrastructure(anyhow::anyhow!("connection refused (10.0.0.3:5432)"));
        assert_eq!(err.public_message(), "internal server error");
    }
}
