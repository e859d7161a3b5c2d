//! # Session Repository
//!
//! Data access layer for the `sessions` table. Each row is one outstanding
//! refresh token; the session's `id` doubles as the JWT `sid` claim.

use chrono::Utc;
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewSession, Session};

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_session: NewSession) -> Result<Session, ApiError> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_session.id)
        .bind(new_session.user_id)
        .bind(&new_session.token)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_by_id(&self, session_id: Uuid) -> Result<Option<Session>, ApiError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Finds the session currently pointed to by a refresh token's literal
    /// value. Used to validate a presented refresh token before rotation.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Session>, ApiError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE token = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_all_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, ApiError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Rotates a session's token in place, preserving its `id` (and
    /// therefore the JWT `sid`/family linkage) while replacing the stored
    /// refresh-token value and extending `expires_at`.
    ///
    /// The `WHERE token = $4` guard is the serialization point for
    /// concurrent refreshes of the same session: if two requests both read
    /// `old_token` as current and race to rotate it, only the first
    /// `UPDATE` matches a row - the second affects zero rows and the caller
    /// treats that as a lost race, not a missing session.
    pub async fn rotate_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
        new_expires_at: chrono::DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET token = $1, expires_at = $2
            WHERE id = $3 AND token = $4
            "#,
        )
        .bind(new_token)
        .bind(new_expires_at)
        .bind(session_id)
        .bind(old_token)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::InvalidToken);
        }

        Ok(())
    }

    pub async fn delete_by_id(&self, session_id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "session".to_string() });
        }

        Ok(())
    }

    /// Deletes every session belonging to a user except the one given,
    /// returning the number of sessions removed.
    pub async fn delete_all_except(&self, user_id: Uuid, keep_session_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE user_id = $1 AND id != $2
            "#,
        )
        .bind(user_id)
        .bind(keep_session_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    /// Deletes every session belonging to a user, returning the count
    /// removed. Used to force a global logout after a password change or
    /// reset, since any refresh token issued under the old password should
    /// stop working.
    pub async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }

    /// Deletes every expired session. Invoked by the background sweeper.
    pub async fn delete_expired(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_struct() {
        let new_session = NewSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "refresh-token-value".to_string(),
            expires_at: Utc::now() + chrono::Duration::days(7),
        };

        assert!(!new_session.token.is_empty());
    }
}
