//! # Cache-Aside User Reader
//!
//! Wraps [`UserRepository`] with a read-through Redis cache at `user:{id}`,
//! 1 hour TTL. Mutating operations elsewhere in the engine layer are
//! responsible for calling [`shared::redis_client::RedisClient::invalidate_user_cache`]
//! before returning success - this reader only ever populates the cache,
//! never invalidates it.

use shared::{errors::ApiError, redis_client::RedisClient};
use tracing::warn;
use uuid::Uuid;

use crate::{domain::User, repository::UserRepository};

#[derive(Clone)]
pub struct UserCache {
    repository: UserRepository,
    redis: RedisClient,
}

impl UserCache {
    pub fn new(repository: UserRepository, redis: RedisClient) -> Self {
        Self { repository, redis }
    }

    /// Reads a user by id, checking the cache first and falling through to
    /// the database on a miss. Redis is non-authoritative here - a cache
    /// outage degrades to hitting the database on every read rather than
    /// failing the request, and a failed cache write is logged and ignored.
    pub async fn get(&self, user_id: Uuid) -> Result<Option<User>, ApiError> {
        match self.redis.get_cached_user::<User>(user_id).await {
            Ok(Some(cached)) => return Ok(Some(cached)),
            Ok(None) => {}
            Err(error) => warn!(%error, %user_id, "user cache read failed, falling back to database"),
        }

        let user = self.repository.find_by_id(user_id).await?;
        if let Some(ref u) = user {
            if let Err(error) = self.redis.cache_user(user_id, u).await {
                warn!(%error, %user_id, "user cache write failed");
            }
        }

        Ok(user)
    }
}
