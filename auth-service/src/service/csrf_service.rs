//! # CSRF Engine
//!
//! Issues and validates the one-shot CSRF tokens required on every
//! state-changing endpoint. Tokens are deliberately **not** bound to a user
//! identity - possession of a valid, unexpired token is the only thing
//! checked. This keeps the pre-auth endpoints (register, login) coverable
//! by the same mechanism as the authenticated ones.

use shared::{auth::random_token, errors::ApiError, redis_client::RedisClient};

#[derive(Clone)]
pub struct CsrfEngine {
    redis: RedisClient,
}

impl CsrfEngine {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    /// Issues a new CSRF token, valid for 24 hours.
    pub async fn generate_token(&self) -> Result<String, ApiError> {
        let token = random_token();
        self.redis.store_csrf_token(&token).await?;
        Ok(token)
    }

    /// Validates a CSRF token by existence alone.
    pub async fn validate_token(&self, token: &str) -> Result<(), ApiError> {
        if token.is_empty() || !self.redis.csrf_token_exists(token).await? {
            return Err(ApiError::CsrfFailed { message: "missing or invalid CSRF token".to_string() });
        }
        Ok(())
    }
}
