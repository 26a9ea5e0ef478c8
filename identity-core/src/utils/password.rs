use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Newtype for a plaintext password so it never reaches logs or dumps.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// Newtype for a stored password digest.
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, AuthError> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let digest = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| AuthError::Infrastructure(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();

    Ok(PasswordHashString::new(digest))
}

/// Verify a password against a stored digest.
///
/// Comparison is constant-time inside argon2. A malformed stored digest
/// verifies as false: the caller gets the same signal as a wrong password,
/// and the anomaly is logged here.
pub fn verify_password(password: &Password, digest: &PasswordHashString) -> bool {
    let parsed = match PasswordHash::new(digest.as_str()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password digest is not parseable");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .is_ok()
}
