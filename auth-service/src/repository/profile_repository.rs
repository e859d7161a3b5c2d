//! # User Profile Repository
//!
//! Data access layer for the `user_profiles` table, the optional 1:1
//! display-data extension of a [`crate::domain::User`].

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::UserProfile;

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<UserProfile>, ApiError> {
        sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Creates an empty profile row for a newly registered user. Called
    /// eagerly at registration so later profile reads never have to
    /// distinguish "no profile yet" from "profile not found".
    pub async fn create_empty(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }
}
