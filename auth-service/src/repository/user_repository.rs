//! # User Repository
//!
//! Data access layer for the `users` table.
//!
//! ## Query Patterns
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Query Patterns                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │ Pattern          │ Example                                              │
//! ├───────────────────┼─────────────────────────────────────────────────────┤
//! │ Case-insensitive │ WHERE lower(email) = lower($1)                       │
//! │ Returning        │ INSERT ... RETURNING * (to get generated fields)     │
//! │ Parameterized    │ Always use $1, $2 (never string interpolation)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Database errors are converted to [`ApiError`] variants:
//!
//! | sqlx Error            | ApiError Variant      | HTTP Status |
//! |-----------------------|-----------------------|-------------|
//! | `RowNotFound`         | `NotFound`            | 404         |
//! | Unique constraint     | `Conflict`            | 409         |
//! | Other                 | `DatabaseError`       | 500         |
//!
//! ## Related Documentation
//!
//! - Entity definitions: [`crate::domain::entities`]
//! - Database schema: `DESIGN.md`

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewUser, User};

/// Repository for user-related database operations.
///
/// # Thread Safety
///
/// `UserRepository` is `Send + Sync` because `PgPool` internally uses `Arc`.
/// It can be safely shared across async tasks and Actix-web workers.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new user in the database.
    ///
    /// # Errors
    ///
    /// - `ApiError::Conflict` if the email or username is already taken
    /// - `ApiError::DatabaseError` for other database errors
    pub async fn create(&self, new_user: NewUser) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                email, password_hash, first_name, last_name, user_name
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.user_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email"))
    }

    /// Finds a user by email address, case-insensitively.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Finds a user by their unique ID.
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Finds a user by their linked username.
    pub async fn find_by_username(&self, user_name: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Updates a user's password hash.
    pub async fn update_password(&self, user_id: Uuid, new_password_hash: &str) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(new_password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "user".to_string() });
        }

        Ok(())
    }

    /// Marks a user's email address as verified.
    pub async fn set_email_verified(&self, user_id: Uuid, verified: bool) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(verified)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "user".to_string() });
        }

        Ok(())
    }

    /// Permanently deletes a user. Cascades to every child table
    /// (`sessions`, `oauth_accounts`, `user_profiles`, `email_verifications`,
    /// `password_resets`) via `ON DELETE CASCADE` foreign keys.
    pub async fn delete(&self, user_id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "user".to_string() });
        }

        Ok(())
    }

    /// Checks whether an email is already registered, case-insensitively.
    pub async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(count.0 > 0)
    }
}

/// Maps a unique-constraint violation on `resource` to `ApiError::Conflict`,
/// leaving every other database error as `ApiError::DatabaseError`.
fn map_unique_violation(err: sqlx::Error, resource: &str) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::Conflict { resource: resource.to_string() };
        }
    }
    ApiError::DatabaseError(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_struct() {
        let new_user = NewUser {
            email: "test@example.com".to_string(),
            password_hash: Some("$argon2id$...".to_string()),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            user_name: None,
        };

        assert_eq!(new_user.email, "test@example.com");
        assert!(new_user.password_hash.is_some());
    }
}
