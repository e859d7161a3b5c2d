//! # Security Events
//!
//! Every security-relevant state transition in the identity service emits a
//! [`SecurityEvent`] through an [`EventEmitter`]. This is the single seam
//! where an operator wires up audit logging, SIEM export, or alerting -
//! without the credential/session/oauth engines needing to know or care who
//! is listening.
//!
//! The default [`EventEmitter`] implementation ([`TracingEventEmitter`])
//! writes each event as a structured `tracing` record at a severity matched
//! to the event (failed logins and lockouts at `warn`, everything else at
//! `info`). Swap in a different [`EventEmitter`] to forward events elsewhere
//! without touching the engines that raise them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! emitter.emit(SecurityEvent::LoginFailed {
//!     email: attempted_email,
//!     reason: LoginFailureReason::InvalidPassword,
//!     ip_address,
//! });
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use uuid::Uuid;

/// Why a login attempt did not succeed. Distinct from the HTTP-facing error
/// returned to the client (which is deliberately generic to avoid
/// account enumeration) - this is for the audit trail only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailureReason {
    UserNotFound,
    InvalidPassword,
    AccountLocked,
    AccountSuspended,
    AccountInactive,
    NoPasswordSet,
}

/// A single security-relevant occurrence, carrying just enough context to be
/// useful in an audit log without duplicating the full domain entity.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SecurityEvent {
    UserRegistered {
        user_id: Uuid,
        email: String,
    },
    LoginSucceeded {
        user_id: Uuid,
        session_id: Uuid,
        ip_address: Option<IpAddr>,
    },
    /// Fired whenever a session is issued - password or OAuth login alike -
    /// distinct from [`Self::LoginSucceeded`]/[`Self::OAuthLoginSucceeded`],
    /// which are about the credential check. This one is about the session.
    SessionCreated {
        user_id: Uuid,
        session_id: Uuid,
        ip: Option<String>,
        user_agent: Option<String>,
    },
    LoginFailed {
        email: String,
        reason: LoginFailureReason,
        ip_address: Option<IpAddr>,
    },
    AccountLocked {
        email: String,
        locked_until: DateTime<Utc>,
    },
    /// Fired when a successful login clears an active lockout - not on
    /// every reset of the attempt counter, only when there was a
    /// `locked_until` in effect for the account being cleared.
    AccountUnlocked {
        email: String,
    },
    TokenRefreshed {
        user_id: Uuid,
        session_id: Uuid,
        family_id: Uuid,
    },
    TokenRefreshFailed {
        reason: &'static str,
    },
    TokenReuseDetected {
        family_id: Uuid,
        user_id: Uuid,
    },
    LoggedOut {
        user_id: Uuid,
        session_id: Uuid,
    },
    SessionRevoked {
        user_id: Uuid,
        session_id: Uuid,
    },
    OtherSessionsRevoked {
        user_id: Uuid,
        current_session_id: Uuid,
        revoked_count: u64,
    },
    PasswordChanged {
        user_id: Uuid,
    },
    PasswordResetRequested {
        user_id: Uuid,
        email: String,
    },
    PasswordResetCompleted {
        user_id: Uuid,
    },
    EmailVerificationRequested {
        user_id: Uuid,
        email: String,
    },
    EmailVerified {
        user_id: Uuid,
    },
    OAuthAccountLinked {
        user_id: Uuid,
        provider: &'static str,
        is_new_user: bool,
    },
    OAuthAccountUnlinked {
        user_id: Uuid,
        provider: &'static str,
    },
    OAuthLoginSucceeded {
        user_id: Uuid,
        session_id: Uuid,
        provider: &'static str,
    },
    OAuthLoginFailed {
        provider: &'static str,
        error: &'static str,
    },
}

impl SecurityEvent {
    /// A short, stable machine name for this event variant, independent of
    /// serde's field layout. Used as the `tracing` event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user_registered",
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::SessionCreated { .. } => "session_created",
            Self::LoginFailed { .. } => "login_failed",
            Self::AccountLocked { .. } => "account_locked",
            Self::AccountUnlocked { .. } => "account_unlocked",
            Self::TokenRefreshed { .. } => "token_refreshed",
            Self::TokenRefreshFailed { .. } => "token_refresh_failed",
            Self::TokenReuseDetected { .. } => "token_reuse_detected",
            Self::LoggedOut { .. } => "logged_out",
            Self::SessionRevoked { .. } => "session_revoked",
            Self::OtherSessionsRevoked { .. } => "other_sessions_revoked",
            Self::PasswordChanged { .. } => "password_changed",
            Self::PasswordResetRequested { .. } => "password_reset_requested",
            Self::PasswordResetCompleted { .. } => "password_reset_completed",
            Self::EmailVerificationRequested { .. } => "email_verification_requested",
            Self::EmailVerified { .. } => "email_verified",
            Self::OAuthAccountLinked { .. } => "oauth_account_linked",
            Self::OAuthAccountUnlinked { .. } => "oauth_account_unlinked",
            Self::OAuthLoginSucceeded { .. } => "oauth_login_succeeded",
            Self::OAuthLoginFailed { .. } => "oauth_login_failed",
        }
    }

    /// Events worth a `warn` level even though they aren't application
    /// errors - the ones an operator wants surfaced above routine traffic.
    pub fn is_security_sensitive(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. }
                | Self::AccountLocked { .. }
                | Self::TokenReuseDetected { .. }
                | Self::TokenRefreshFailed { .. }
                | Self::OAuthLoginFailed { .. }
        )
    }
}

/// Envelope wrapping a [`SecurityEvent`] with emission metadata. Kept
/// separate from the event payload so the payload stays small and
/// serde-friendly while still carrying a stable id and timestamp for
/// downstream consumers (audit stores, SIEM forwarders).
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: SecurityEvent,
}

impl SecurityEventEnvelope {
    pub fn new(event: SecurityEvent) -> Self {
        Self { event_id: Uuid::new_v4(), occurred_at: Utc::now(), event }
    }
}

/// Sink for [`SecurityEvent`]s. Engines depend on this trait, not on a
/// concrete sink, so the identity service can be embedded anywhere without
/// dragging a specific audit backend along.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: SecurityEvent);
}

/// Default [`EventEmitter`] that records every event as a structured
/// `tracing` event. This is sufficient for log-based auditing; anything
/// requiring durable storage or export wraps or replaces this.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventEmitter;

impl EventEmitter for TracingEventEmitter {
    fn emit(&self, event: SecurityEvent) {
        let envelope = SecurityEventEnvelope::new(event);
        let payload = serde_json::to_string(&envelope.event).unwrap_or_default();

        if envelope.event.is_security_sensitive() {
            tracing::warn!(
                event_id = %envelope.event_id,
                event = envelope.event.name(),
                payload = %payload,
                "security event"
            );
        } else {
            tracing::info!(
                event_id = %envelope.event_id,
                event = envelope.event.name(),
                payload = %payload,
                "security event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_stable() {
        let event = SecurityEvent::LoginSucceeded {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            ip_address: None,
        };
        assert_eq!(event.name(), "login_succeeded");
    }

    #[test]
    fn test_session_created_and_account_unlocked_names() {
        let created =
            SecurityEvent::SessionCreated { user_id: Uuid::new_v4(), session_id: Uuid::new_v4(), ip: None, user_agent: None };
        assert_eq!(created.name(), "session_created");
        assert!(!created.is_security_sensitive());

        let unlocked = SecurityEvent::AccountUnlocked { email: "a@b.com".to_string() };
        assert_eq!(unlocked.name(), "account_unlocked");
        assert!(!unlocked.is_security_sensitive());
    }

    #[test]
    fn test_security_sensitive_classification() {
        let locked = SecurityEvent::AccountLocked { email: "a@b.com".to_string(), locked_until: Utc::now() };
        assert!(locked.is_security_sensitive());

        let registered = SecurityEvent::UserRegistered { user_id: Uuid::new_v4(), email: "a@b.com".to_string() };
        assert!(!registered.is_security_sensitive());
    }

    #[test]
    fn test_envelope_serializes_with_flattened_event() {
        let envelope = SecurityEventEnvelope::new(SecurityEvent::EmailVerified { user_id: Uuid::new_v4() });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event"], "email_verified");
        assert!(json.get("event_id").is_some());
    }

    #[test]
    fn test_tracing_emitter_does_not_panic() {
        let emitter = TracingEventEmitter;
        emitter.emit(SecurityEvent::LoginFailed {
            email: "test@example.com".to_string(),
            reason: LoginFailureReason::InvalidPassword,
            ip_address: None,
        });
    }
}
