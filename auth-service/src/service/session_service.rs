//! # Session & Rotation Engine
//!
//! Owns the lifecycle of a [`Session`] row and its paired JWT family:
//! issuing the first token pair at login/register, rotating refresh tokens
//! with reuse detection, logout, and session inventory/selective revocation.
//!
//! ## Refresh Rotation
//!
//! Every session has exactly one "head" - the most recently issued refresh
//! token for its family - tracked in Redis at `token_family:{familyId}`
//! ([`TokenFamilyHead`]). A `/auth/refresh` call presenting anything other
//! than the current head is refresh-token reuse: the family head is
//! invalidated and the associated session is deleted, but (per design
//! decision, see `DESIGN.md`) other sessions belonging to the user are left
//! alone - only the reused family is torn down.

use chrono::{Duration as ChronoDuration, Utc};
use shared::{
    auth::{jwt::JwtService, TokenPair},
    config::JwtConfig,
    errors::ApiError,
    redis_client::{RedisClient, SessionMeta, TokenFamilyHead},
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{EventEmitter, NewSession, SecurityEvent, User},
    repository::SessionRepository,
};

/// A session as presented to the client: the durable row plus whatever
/// transport metadata Redis still has for it.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: Uuid,
    pub created_at: chrono::DateTime<Utc>,
    pub expires_at: chrono::DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub last_used_at: Option<chrono::DateTime<Utc>>,
    pub is_current: bool,
}

#[derive(Clone)]
pub struct SessionEngine {
    session_repository: SessionRepository,
    jwt_service: Arc<JwtService>,
    jwt_config: JwtConfig,
    redis: RedisClient,
    events: Arc<dyn EventEmitter>,
}

impl SessionEngine {
    pub fn new(
        session_repository: SessionRepository,
        jwt_service: Arc<JwtService>,
        jwt_config: JwtConfig,
        redis: RedisClient,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        Self { session_repository, jwt_service, jwt_config, redis, events }
    }

    /// Issues the first token pair for a new session - the session id and
    /// the refresh-token family id are the same value at this point, since
    /// nothing has rotated yet.
    pub async fn create_session(
        &self,
        user: &User,
        ip: Option<String>,
        user_agent: Option<String>,
        login_method: &'static str,
    ) -> Result<(Uuid, TokenPair), ApiError> {
        let session_id = Uuid::new_v4();
        let family_id = session_id;

        let tokens =
            self.jwt_service.generate_tokens(user.id, &user.email, user.role.as_str(), session_id, family_id)?;

        let expires_at = Utc::now() + ChronoDuration::seconds(self.jwt_config.refresh_token_ttl_seconds as i64);

        self.session_repository
            .create(NewSession { id: session_id, user_id: user.id, token: tokens.refresh_token.clone(), expires_at })
            .await?;

        self.redis
            .set_token_family_head(
                family_id,
                &TokenFamilyHead { current_token: tokens.refresh_token.clone(), user_id: user.id },
            )
            .await?;

        let now = Utc::now();
        self.redis
            .set_session_meta(
                session_id,
                &SessionMeta {
                    ip: ip.clone(),
                    user_agent: user_agent.clone(),
                    last_used_at: now,
                    last_login_at: now,
                    login_method: login_method.to_string(),
                },
            )
            .await?;

        if login_method == "password" {
            self.events.emit(SecurityEvent::LoginSucceeded {
                user_id: user.id,
                session_id,
                ip_address: ip.as_deref().and_then(|s| s.parse().ok()),
            });
        } else {
            self.events.emit(SecurityEvent::OAuthLoginSucceeded { user_id: user.id, session_id, provider: login_method });
        }
        self.events.emit(SecurityEvent::SessionCreated { user_id: user.id, session_id, ip, user_agent });

        Ok((session_id, tokens))
    }

    /// Rotates a refresh token, detecting reuse of an already-rotated
    /// member of the family.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let claims = self.jwt_service.validate_refresh_token(refresh_token).map_err(|error| {
            self.events.emit(SecurityEvent::TokenRefreshFailed { reason: "invalid or expired refresh token" });
            error
        })?;

        // A missing family head just means Redis never saw this family (restart,
        // eviction) or this is the very first refresh after login under an older
        // deploy - it is not evidence of reuse. Fall through to the Session row,
        // which is the durable source of truth, instead of failing outright.
        if let Some(head) = self.redis.get_token_family_head(claims.fid).await? {
            if head.current_token != refresh_token {
                warn!(family_id = %claims.fid, user_id = %claims.sub, "refresh token reuse detected");
                self.events.emit(SecurityEvent::TokenReuseDetected { family_id: claims.fid, user_id: claims.sub });

                self.redis.delete_token_family_head(claims.fid).await?;
                let _ = self.session_repository.delete_by_id(claims.sid).await;
                self.redis.delete_session_meta(claims.sid).await?;

                return Err(ApiError::InvalidToken);
            }
        }

        let session = self
            .session_repository
            .find_by_id(claims.sid)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if session.token != refresh_token {
            return Err(ApiError::InvalidToken);
        }

        let new_tokens =
            self.jwt_service.generate_tokens(claims.sub, &claims.email, &claims.role, claims.sid, claims.fid)?;

        let new_expires_at = Utc::now() + ChronoDuration::seconds(self.jwt_config.refresh_token_ttl_seconds as i64);

        self.session_repository
            .rotate_token(claims.sid, refresh_token, &new_tokens.refresh_token, new_expires_at)
            .await?;

        self.redis
            .set_token_family_head(
                claims.fid,
                &TokenFamilyHead { current_token: new_tokens.refresh_token.clone(), user_id: claims.sub },
            )
            .await?;

        if let Some(mut meta) = self.redis.get_session_meta(claims.sid).await? {
            meta.last_used_at = Utc::now();
            self.redis.set_session_meta(claims.sid, &meta).await?;
        }

        info!(user_id = %claims.sub, session_id = %claims.sid, "refresh token rotated");
        self.events.emit(SecurityEvent::TokenRefreshed { user_id: claims.sub, session_id: claims.sid, family_id: claims.fid });

        Ok(new_tokens)
    }

    /// Ends the session backing the given refresh token. Idempotent: a
    /// malformed/expired token or a session that's already gone both count
    /// as a successful logout, since the end state the caller wants - "this
    /// token no longer works" - already holds.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        let Ok(claims) = self.jwt_service.validate_refresh_token(refresh_token) else {
            return Ok(());
        };

        let _ = self.session_repository.delete_by_id(claims.sid).await;
        self.redis.delete_token_family_head(claims.fid).await?;
        self.redis.delete_session_meta(claims.sid).await?;

        self.events.emit(SecurityEvent::LoggedOut { user_id: claims.sub, session_id: claims.sid });

        Ok(())
    }

    /// Lists every live session for a user, annotated with transport
    /// metadata where Redis still has it.
    pub async fn list_sessions(&self, user_id: Uuid, current_session_id: Uuid) -> Result<Vec<SessionInfo>, ApiError> {
        let sessions = self.session_repository.find_all_for_user(user_id).await?;
        let mut result = Vec::with_capacity(sessions.len());

        for session in sessions {
            let meta = self.redis.get_session_meta(session.id).await?;
            result.push(SessionInfo {
                id: session.id,
                created_at: session.created_at,
                expires_at: session.expires_at,
                ip: meta.as_ref().and_then(|m| m.ip.clone()),
                user_agent: meta.as_ref().and_then(|m| m.user_agent.clone()),
                last_used_at: meta.as_ref().map(|m| m.last_used_at),
                is_current: session.id == current_session_id,
            });
        }

        Ok(result)
    }

    /// Revokes a single session belonging to `user_id`. Returns
    /// `ApiError::NotFound` if the session doesn't exist or isn't owned by
    /// the caller.
    pub async fn revoke_session(&self, user_id: Uuid, session_id: Uuid) -> Result<(), ApiError> {
        let session = self
            .session_repository
            .find_by_id(session_id)
            .await?
            .ok_or(ApiError::NotFound { resource: "session".to_string() })?;

        if session.user_id != user_id {
            return Err(ApiError::NotFound { resource: "session".to_string() });
        }

        self.session_repository.delete_by_id(session_id).await?;
        self.redis.delete_session_meta(session_id).await?;
        // The family head for this session's token is orphaned and will
        // expire on its own TTL; deleting it eagerly is unnecessary since
        // the session row it would rotate is already gone.

        self.events.emit(SecurityEvent::SessionRevoked { user_id, session_id });

        Ok(())
    }

    /// Revokes every session for `user_id` except `keep_session_id`.
    pub async fn revoke_other_sessions(&self, user_id: Uuid, keep_session_id: Uuid) -> Result<u64, ApiError> {
        let sessions = self.session_repository.find_all_for_user(user_id).await?;

        for session in &sessions {
            if session.id != keep_session_id {
                self.redis.delete_session_meta(session.id).await?;
            }
        }

        let revoked_count = self.session_repository.delete_all_except(user_id, keep_session_id).await?;

        self.events.emit(SecurityEvent::OtherSessionsRevoked { user_id, current_session_id: keep_session_id, revoked_count });

        Ok(revoked_count)
    }
}
