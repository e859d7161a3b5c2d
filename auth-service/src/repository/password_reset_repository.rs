//! # Password Reset Repository
//!
//! Data access layer for the `password_resets` table: single-use tokens
//! valid for one hour, deleted by the background sweeper once expired.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewPasswordReset, PasswordReset};

#[derive(Debug, Clone)]
pub struct PasswordResetRepository {
    pool: PgPool,
}

impl PasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_reset: NewPasswordReset) -> Result<PasswordReset, ApiError> {
        sqlx::query_as::<_, PasswordReset>(
            r#"
            INSERT INTO password_resets (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(new_reset.user_id)
        .bind(&new_reset.token)
        .bind(new_reset.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<PasswordReset>, ApiError> {
        sqlx::query_as::<_, PasswordReset>("SELECT * FROM password_resets WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn mark_used(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE password_resets
            SET used = true, used_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "password_reset".to_string() });
        }

        Ok(())
    }

    /// Deletes every expired password-reset row. Invoked by the background
    /// sweeper alongside [`crate::repository::SessionRepository::delete_expired`].
    pub async fn delete_expired(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM password_resets WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }
}
