//! # Email Verification Repository
//!
//! Data access layer for the `email_verifications` table. Rows are never
//! deleted by the background sweeper - expiry is checked at verification
//! time from `created_at`, not from a stored expiry column.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{EmailVerification, NewEmailVerification};

#[derive(Debug, Clone)]
pub struct EmailVerificationRepository {
    pool: PgPool,
}

impl EmailVerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_verification: NewEmailVerification) -> Result<EmailVerification, ApiError> {
        sqlx::query_as::<_, EmailVerification>(
            r#"
            INSERT INTO email_verifications (user_id, token)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(new_verification.user_id)
        .bind(&new_verification.token)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<EmailVerification>, ApiError> {
        sqlx::query_as::<_, EmailVerification>("SELECT * FROM email_verifications WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn mark_verified(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE email_verifications
            SET verified = true, verified_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "email_verification".to_string() });
        }

        Ok(())
    }
}
