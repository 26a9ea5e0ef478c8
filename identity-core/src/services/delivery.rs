//! Code delivery collaborator: email via SMTP, SMS stubbed to the log.
//!
//! Fire-and-forget from the engine's perspective; a delivery failure never
//! fails the flow that requested it.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::error::AuthError;
use crate::models::Identity;

/// Channel chosen from the credential the user presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChannel {
    Email,
    Sms,
}

#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(
        &self,
        identity: &Identity,
        code: &str,
        channel: CodeChannel,
    ) -> Result<(), AuthError>;
}

/// SMTP-backed sender. SMS delivery is logged only until a provider is
/// wired up.
#[derive(Clone)]
pub struct SmtpCodeSender {
    mailer: SmtpTransport,
    from_email: String,
    code_validity_minutes: i64,
}

impl SmtpCodeSender {
    pub fn new(config: &SmtpConfig, code_validity_minutes: i64) -> Result<Self, AuthError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AuthError::Infrastructure(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP code sender initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
            code_validity_minutes,
        })
    }

    async fn send_email(&self, to_email: &str, first_name: &str, code: &str) -> Result<(), AuthError> {
        let body = format!(
            "Hello {first_name},\n\n\
             Your verification code is: {code}\n\n\
             It expires in {} minutes. If you did not request it, you can ignore this message.\n",
            self.code_validity_minutes
        );

        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        AuthError::Infrastructure(e.into())
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AuthError::Infrastructure(e.into()))?)
            .subject("Your verification code")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AuthError::Infrastructure(e.into()))?;

        // Blocking SMTP I/O stays off the async runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AuthError::Infrastructure(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, "verification code email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "failed to send verification code email");
                Err(AuthError::Infrastructure(anyhow::anyhow!(e.to_string())))
            }
        }
    }
}

#[async_trait]
impl CodeSender for SmtpCodeSender {
    async fn send_code(
        &self,
        identity: &Identity,
        code: &str,
        channel: CodeChannel,
    ) -> Result<(), AuthError> {
        match channel {
            CodeChannel::Email => {
                self.send_email(&identity.email, &identity.first_name, code)
                    .await
            }
            CodeChannel::Sms => {
                // TODO: wire an SMS provider; until then the code is only logged.
                tracing::info!(phone = %identity.phone, "SMS verification code generated");
                Ok(())
            }
        }
    }
}

/// Capturing sender for tests.
#[derive(Default)]
pub struct MockCodeSender {
    sent: Mutex<Vec<(Uuid, String, CodeChannel)>>,
    pub fail: bool,
}

impl MockCodeSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that errors on every send, for failure-swallowing tests.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(Uuid, String, CodeChannel)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_code(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, code, _)| code.clone())
    }
}

#[async_trait]
impl CodeSender for MockCodeSender {
    async fn send_code(
        &self,
        identity: &Identity,
        code: &str,
        channel: CodeChannel,
    ) -> Result<(), AuthError> {
        if self.fail {
            return Err(AuthError::Infrastructure(anyhow::anyhow!(
                "mock delivery failure"
            )));
        }
        self.sent
            .lock()
            .unwrap()
            .push((identity.identity_id, code.to_string(), channel));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_sender_builds_from_config() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            user: "mailer".to_string(),
            password: "password".to_string(),
            from_email: "noreply@example.com".to_string(),
        };

        assert!(SmtpCodeSender::new(&config, 15).is_ok());
    }
}
