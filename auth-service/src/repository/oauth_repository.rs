//! # OAuth Account Repository
//!
//! Data access layer for the `oauth_accounts` table: linked third-party
//! identities, unique per `(provider, provider_id)`.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewOAuthAccount, OAuthAccount, OAuthProvider};

#[derive(Debug, Clone)]
pub struct OAuthRepository {
    pool: PgPool,
}

impl OAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_account: NewOAuthAccount) -> Result<OAuthAccount, ApiError> {
        sqlx::query_as::<_, OAuthAccount>(
            r#"
            INSERT INTO oauth_accounts (
                user_id, provider, provider_id, access_token, refresh_token
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new_account.user_id)
        .bind(new_account.provider)
        .bind(&new_account.provider_id)
        .bind(&new_account.access_token)
        .bind(&new_account.refresh_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.code().as_deref() == Some("23505") {
                    return ApiError::Conflict { resource: "oauth_account".to_string() };
                }
            }
            ApiError::DatabaseError(e)
        })
    }

    pub async fn find_by_provider_id(
        &self,
        provider: OAuthProvider,
        provider_id: &str,
    ) -> Result<Option<OAuthAccount>, ApiError> {
        sqlx::query_as::<_, OAuthAccount>(
            r#"
            SELECT * FROM oauth_accounts
            WHERE provider = $1 AND provider_id = $2
            "#,
        )
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_all_for_user(&self, user_id: Uuid) -> Result<Vec<OAuthAccount>, ApiError> {
        sqlx::query_as::<_, OAuthAccount>("SELECT * FROM oauth_accounts WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn delete(&self, user_id: Uuid, provider: OAuthProvider) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM oauth_accounts WHERE user_id = $1 AND provider = $2")
            .bind(user_id)
            .bind(provider)
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "oauth_account".to_string() });
        }

        Ok(())
    }

    /// Counts linked providers for a user, used to refuse unlinking the last
    /// remaining authentication method on a passwordless account.
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM oauth_accounts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(count.0)
    }
}
