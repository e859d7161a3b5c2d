//! # Outbound Mail
//!
//! Transactional email for the credential engine: email verification and
//! password reset links. The engine depends on the [`Mailer`] trait, not a
//! concrete transport, so tests can substitute a double and a real
//! deployment can swap in an SMTP-backed implementation without touching
//! business logic.

use async_trait::async_trait;
use shared::errors::ApiError;
use tracing::info;

/// Sink for transactional email triggered by the credential engine.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), ApiError>;
    async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<(), ApiError>;
}

/// Default [`Mailer`] that logs the link it would have sent instead of
/// dispatching real SMTP traffic. Sufficient for local development; a
/// production deployment wires an SMTP-backed implementation using
/// [`shared::config::MailerConfig`] in its place.
#[derive(Debug, Clone)]
pub struct LoggingMailer {
    frontend_url: String,
}

impl LoggingMailer {
    pub fn new(frontend_url: String) -> Self {
        Self { frontend_url }
    }
}

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), ApiError> {
        let link = format!("{}/verify-email?token={}", self.frontend_url, token);
        info!(to = %to_email, link = %link, "would send verification email");
        Ok(())
    }

    async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<(), ApiError> {
        let link = format!("{}/reset-password?token={}", self.frontend_url, token);
        info!(to = %to_email, link = %link, "would send password reset email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_mailer_never_errors() {
        let mailer = LoggingMailer::new("http://localhost:3000".to_string());
        assert!(mailer.send_verification_email("a@b.com", "tok").await.is_ok());
        assert!(mailer.send_password_reset_email("a@b.com", "tok").await.is_ok());
    }
}
