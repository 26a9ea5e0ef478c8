//! Reset-code state machine: one pending 8-digit code per credential,
//! valid for a fixed window, consumed on first successful use.

use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::AuthError;
use crate::models::ResetCode;
use crate::services::store::ResetCodeRepo;

/// Issues and consumes one-time reset codes over a [`ResetCodeRepo`].
#[derive(Clone)]
pub struct ResetCodeService {
    repo: Arc<dyn ResetCodeRepo>,
    validity_minutes: i64,
}

impl ResetCodeService {
    pub fn new(repo: Arc<dyn ResetCodeRepo>, validity_minutes: i64) -> Self {
        Self {
            repo,
            validity_minutes,
        }
    }

    /// Issue a fresh code for the key, overwriting any pending one.
    ///
    /// Returns the plaintext code for delivery; only its hash is stored.
    pub async fn issue(&self, credential_key: &str) -> Result<String, AuthError> {
        let code = generate_code();
        let record = ResetCode::new(credential_key, ResetCode::hash_code(&code));
        self.repo.upsert(&record).await?;

        tracing::info!(credential_key = %credential_key, "reset code issued");
        Ok(code)
    }

    /// Check the supplied code against the pending one.
    ///
    /// False when no code is pending, the value mismatches, or the window
    /// has passed. Expired rows are deleted as part of the check; a
    /// mismatch leaves the pending code in place. A match consumes the row,
    /// so the same code can never be accepted twice.
    pub async fn verify_and_consume(
        &self,
        credential_key: &str,
        supplied: &str,
    ) -> Result<bool, AuthError> {
        let Some(pending) = self.repo.find(credential_key).await? else {
            return Ok(false);
        };

        if pending.is_expired(self.validity_minutes) {
            self.repo.delete(credential_key).await?;
            tracing::info!(credential_key = %credential_key, "expired reset code discarded");
            return Ok(false);
        }

        let supplied_hash = ResetCode::hash_code(supplied);
        let matches: bool = pending
            .code_hash
            .as_bytes()
            .ct_eq(supplied_hash.as_bytes())
            .into();
        if !matches {
            return Ok(false);
        }

        self.repo.delete(credential_key).await?;
        Ok(true)
    }

    /// Delete every code older than the validity window. Idempotent; safe
    /// to run concurrently with verify-and-consume, whose own expiry check
    /// covers a delayed sweep.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let cutoff = Utc::now() - Duration::minutes(self.validity_minutes);
        let swept = self.repo.delete_issued_before(cutoff).await?;
        if swept > 0 {
            tracing::info!(swept, "expired reset codes swept");
        }
        Ok(swept)
    }
}

/// Cryptographically random 8-digit code, leading zeros preserved.
fn generate_code() -> String {
    format!("{:08}", rand::thread_rng().gen_range(0..100_000_000u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_eight_digits_with_leading_zeros() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 8);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
