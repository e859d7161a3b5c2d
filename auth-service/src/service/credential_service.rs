//! # Credential Engine
//!
//! Everything that touches a password or a one-time proof-of-identity
//! token: registration, login (with lockout), password change/reset, and
//! email verification. Session issuance itself is delegated to
//! [`crate::service::session_service::SessionEngine`] - this engine hands
//! back a [`User`] on success and lets the caller decide how to turn that
//! into tokens, since OAuth login needs the same session step without any
//! of the password machinery here.

use chrono::{Duration as ChronoDuration, Utc};
use shared::{
    auth::{password::PasswordValidator, PasswordHasher},
    errors::ApiError,
    redis_client::RedisClient,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{EventEmitter, LoginFailureReason, NewEmailVerification, NewPasswordReset, NewUser, SecurityEvent, User},
    repository::{EmailVerificationRepository, PasswordResetRepository, ProfileRepository, SessionRepository, UserRepository},
    service::mailer::Mailer,
};

const PASSWORD_RESET_VALIDITY: ChronoDuration = ChronoDuration::hours(1);

#[derive(Clone)]
pub struct CredentialEngine {
    user_repository: UserRepository,
    profile_repository: ProfileRepository,
    email_verification_repository: EmailVerificationRepository,
    password_reset_repository: PasswordResetRepository,
    session_repository: SessionRepository,
    password_hasher: Arc<PasswordHasher>,
    mailer: Arc<dyn Mailer>,
    redis: RedisClient,
    events: Arc<dyn EventEmitter>,
}

impl CredentialEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repository: UserRepository,
        profile_repository: ProfileRepository,
        email_verification_repository: EmailVerificationRepository,
        password_reset_repository: PasswordResetRepository,
        session_repository: SessionRepository,
        password_hasher: Arc<PasswordHasher>,
        mailer: Arc<dyn Mailer>,
        redis: RedisClient,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            user_repository,
            profile_repository,
            email_verification_repository,
            password_reset_repository,
            session_repository,
            password_hasher,
            mailer,
            redis,
            events,
        }
    }

    /// Creates a new password-auth user, an empty profile row, and fires off
    /// an email verification token. Returns `ApiError::Conflict` if the email
    /// is already taken.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        user_name: Option<String>,
    ) -> Result<User, ApiError> {
        PasswordValidator::validate(password).map_err(|reasons| ApiError::BadRequest { message: reasons.join(", ") })?;

        let password_hash = self.password_hasher.hash(password)?;

        let user = self
            .user_repository
            .create(NewUser {
                email: email.to_string(),
                password_hash: Some(password_hash),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                user_name,
            })
            .await?;

        self.profile_repository.create_empty(user.id).await?;

        self.events.emit(SecurityEvent::UserRegistered { user_id: user.id, email: user.email.clone() });
        info!(user_id = %user.id, "user registered");

        self.request_email_verification(&user).await?;

        Ok(user)
    }

    /// Validates a password login, enforcing the per-email lockout window.
    /// Returns the authenticated [`User`] on success; callers are
    /// responsible for issuing a session.
    pub async fn login(&self, email: &str, password: &str, ip: Option<std::net::IpAddr>) -> Result<User, ApiError> {
        // The lockout check is a convenience, not the sole line of defense -
        // if Redis is unreachable we skip it and fall through to the normal
        // credential check rather than locking every user out of the API.
        let mut was_locked = false;
        match self.redis.get_login_attempts(email).await {
            Ok(Some(attempts)) => {
                if let Some(until) = attempts.locked_until {
                    if until > Utc::now() {
                        return Err(ApiError::AccountLocked { until });
                    }
                    was_locked = true;
                }
            }
            Ok(None) => {}
            Err(error) => warn!(%error, %email, "lockout check failed, proceeding without it"),
        }

        let user = match self.user_repository.find_by_email(email).await? {
            Some(user) => user,
            None => {
                self.record_failed_login(email, LoginFailureReason::UserNotFound, ip).await?;
                return Err(ApiError::InvalidCredentials);
            }
        };

        let Some(password_hash) = user.password_hash.as_deref() else {
            self.record_failed_login(email, LoginFailureReason::NoPasswordSet, ip).await?;
            return Err(ApiError::InvalidCredentials);
        };

        if !self.password_hasher.verify(password, password_hash)? {
            self.record_failed_login(email, LoginFailureReason::InvalidPassword, ip).await?;
            return Err(ApiError::InvalidCredentials);
        }

        if user.is_suspended {
            self.record_failed_login(email, LoginFailureReason::AccountSuspended, ip).await?;
            return Err(ApiError::InvalidCredentials);
        }

        if !user.is_active {
            self.record_failed_login(email, LoginFailureReason::AccountInactive, ip).await?;
            return Err(ApiError::InvalidCredentials);
        }

        self.redis.reset_login_attempts(email).await?;

        if was_locked {
            self.events.emit(SecurityEvent::AccountUnlocked { email: email.to_string() });
        }

        Ok(user)
    }

    async fn record_failed_login(
        &self,
        email: &str,
        reason: LoginFailureReason,
        ip: Option<std::net::IpAddr>,
    ) -> Result<(), ApiError> {
        let attempts = self.redis.record_failed_login(email).await?;

        if let Some(until) = attempts.locked_until {
            warn!(%email, "account locked after repeated failed logins");
            self.events.emit(SecurityEvent::AccountLocked { email: email.to_string(), locked_until: until });
        }

        self.events.emit(SecurityEvent::LoginFailed { email: email.to_string(), reason, ip_address: ip });

        Ok(())
    }

    /// Changes a user's password given their current one. Invalidates the
    /// cached user row and forces a global logout by deleting every session
    /// the user currently holds - a changed password should mean every
    /// existing refresh token stops working, not just the next login.
    pub async fn change_password(&self, user_id: Uuid, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound { resource: "user".to_string() })?;

        let current_hash = user.password_hash.as_deref().ok_or(ApiError::InvalidCredentials)?;

        if !self.password_hasher.verify(current_password, current_hash)? {
            return Err(ApiError::InvalidCredentials);
        }

        PasswordValidator::validate(new_password).map_err(|reasons| ApiError::BadRequest { message: reasons.join(", ") })?;

        let new_hash = self.password_hasher.hash(new_password)?;
        self.user_repository.update_password(user_id, &new_hash).await?;
        self.redis.invalidate_user_cache(user_id).await?;
        self.session_repository.delete_all_for_user(user_id).await?;

        self.events.emit(SecurityEvent::PasswordChanged { user_id });

        Ok(())
    }

    /// Issues a password reset token and emails it, unless no account with
    /// that email exists - in which case this silently succeeds to avoid
    /// leaking account existence.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let Some(user) = self.user_repository.find_by_email(email).await? else {
            return Ok(());
        };

        let token = shared::auth::random_token();
        let expires_at = Utc::now() + PASSWORD_RESET_VALIDITY;

        self.password_reset_repository
            .create(NewPasswordReset { user_id: user.id, token: token.clone(), expires_at })
            .await?;

        if let Err(error) = self.mailer.send_password_reset_email(&user.email, &token).await {
            warn!(%error, user_id = %user.id, "failed to send password reset email");
        }

        self.events.emit(SecurityEvent::PasswordResetRequested { user_id: user.id, email: user.email.clone() });

        Ok(())
    }

    /// Completes a password reset. The token must exist, be unused, and be
    /// within its 1 hour validity window. Like [`Self::change_password`],
    /// this forces a global logout for the affected user.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Uuid, ApiError> {
        let reset = self
            .password_reset_repository
            .find_by_token(token)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if !reset.is_valid(Utc::now()) {
            return Err(ApiError::TokenExpired);
        }

        PasswordValidator::validate(new_password).map_err(|reasons| ApiError::BadRequest { message: reasons.join(", ") })?;

        let new_hash = self.password_hasher.hash(new_password)?;
        self.user_repository.update_password(reset.user_id, &new_hash).await?;
        self.password_reset_repository.mark_used(reset.id).await?;
        self.redis.invalidate_user_cache(reset.user_id).await?;
        self.session_repository.delete_all_for_user(reset.user_id).await?;

        self.events.emit(SecurityEvent::PasswordResetCompleted { user_id: reset.user_id });

        Ok(reset.user_id)
    }

    /// Issues a fresh email verification token and emails it. Safe to call
    /// repeatedly - each call creates a new token row, the old ones simply
    /// age out of their 24 hour validity window unused.
    pub async fn request_email_verification(&self, user: &User) -> Result<(), ApiError> {
        if user.email_verified {
            return Ok(());
        }

        let token = shared::auth::random_token();

        self.email_verification_repository
            .create(NewEmailVerification { user_id: user.id, token: token.clone() })
            .await?;

        if let Err(error) = self.mailer.send_verification_email(&user.email, &token).await {
            warn!(%error, user_id = %user.id, "failed to send verification email");
        }

        self.events.emit(SecurityEvent::EmailVerificationRequested { user_id: user.id, email: user.email.clone() });

        Ok(())
    }

    /// Consumes an email verification token and marks the owning user as
    /// verified.
    pub async fn verify_email(&self, token: &str) -> Result<Uuid, ApiError> {
        let verification = self
            .email_verification_repository
            .find_by_token(token)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if verification.verified {
            return Err(ApiError::BadRequest { message: "email already verified".to_string() });
        }

        if verification.is_expired(Utc::now()) {
            return Err(ApiError::TokenExpired);
        }

        self.email_verification_repository.mark_verified(verification.id).await?;
        self.user_repository.set_email_verified(verification.user_id, true).await?;
        self.redis.invalidate_user_cache(verification.user_id).await?;

        self.events.emit(SecurityEvent::EmailVerified { user_id: verification.user_id });

        Ok(verification.user_id)
    }
}
