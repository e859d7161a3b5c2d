//! # Identity Domain Entities
//!
//! Core domain entities for the identity/session service. Entities represent
//! persistent business objects that map directly to database tables.
//!
//! ## Entity Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Entities                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌────────────────────────┐              │
//! │  │        User         │        │     UserProfile        │              │
//! │  ├─────────────────────┤  1:1   ├────────────────────────┤              │
//! │  │ - id (PK)           │───────▶│ - user_id (FK, unique) │              │
//! │  │ - email             │        │ - display_name         │              │
//! │  │ - password_hash?    │        │ - bio, avatar, website │              │
//! │  │ - user_name?        │        └────────────────────────┘              │
//! │  │ - role              │                                                │
//! │  └──────────┬──────────┘                                                │
//! │             │ 1:N                           1:N                          │
//! │             ▼                                ▼                          │
//! │  ┌─────────────────────┐        ┌────────────────────────┐              │
//! │  │       Session       │        │     OAuthAccount        │              │
//! │  ├─────────────────────┤        ├────────────────────────┤              │
//! │  │ - id (== JWT sid)   │        │ - provider, provider_id│              │
//! │  │ - token (unique)    │        │ - access/refresh token │              │
//! │  │ - expires_at        │        └────────────────────────┘              │
//! │  └─────────────────────┘                                                │
//! │             │                                                           │
//! │  ┌──────────┴──────────┐        ┌────────────────────────┐              │
//! │  │  EmailVerification  │        │     PasswordReset       │              │
//! │  │  - token (unique)   │        │  - token (unique)       │              │
//! │  │  - verified         │        │  - expires_at, used     │              │
//! │  └─────────────────────┘        └────────────────────────┘              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entity Types
//!
//! | Entity               | Table                | Purpose                              |
//! |----------------------|-----------------------|---------------------------------------|
//! | [`User`]             | `users`               | Identity, credentials, role           |
//! | [`Session`]          | `sessions`            | One row per outstanding refresh token  |
//! | [`OAuthAccount`]     | `oauth_accounts`      | Linked third-party provider identity   |
//! | [`UserProfile`]      | `user_profiles`       | Optional display/bio extension         |
//! | [`EmailVerification`]| `email_verifications` | Email-confirmation token lifecycle    |
//! | [`PasswordReset`]    | `password_resets`     | Password-reset token lifecycle         |
//!
//! ## Security Considerations
//!
//! - **Never expose `password_hash`**: use [`UserProfile`]-adjacent response DTOs
//!   in the API layer instead of serializing [`User`] directly.
//! - **Hard deletes**: deleting a [`User`] cascades via foreign keys to every
//!   child table (`sessions`, `oauth_accounts`, `email_verifications`,
//!   `password_resets`, `user_profiles`) - there is no soft-delete column.
//! - **Session.token is the refresh token itself**, not a hash of it. The
//!   token's own entropy (issued by [`shared::auth::jwt`]) and the JWT
//!   signature are what prevent guessing.
//!
//! ## Related Documentation
//!
//! - Database schema: `DESIGN.md`
//! - JWT tokens: [`shared::auth::jwt`]
//! - Password hashing: [`shared::auth::password`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// ROLE
// =============================================================================

/// A user's authorization role. Flat, not hierarchical - see
/// [`shared::auth::middleware::UserRole`] for the permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

/// The third-party identity provider an [`OAuthAccount`] was linked through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            _ => None,
        }
    }
}

// =============================================================================
// USER ENTITY
// =============================================================================

/// Complete user entity as stored in the `users` table.
///
/// Contains the credential (`password_hash`), which is `None` for accounts
/// created solely through OAuth. **Never serialize this struct directly in
/// an HTTP response** - the API layer maps it to a response DTO that omits
/// `password_hash`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Case-preserving, but unique case-insensitively (enforced by a
    /// `lower(email)` unique index, not by normalizing this field).
    pub email: String,
    /// Argon2id hash in PHC format. `None` for OAuth-only accounts.
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Optional handle, unique when present.
    pub user_name: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub is_active: bool,
    pub is_suspended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A login with a password requires a stored hash; OAuth-only accounts
    /// cannot authenticate this way.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Data required to create a new user. `password_hash` is `None` for an
/// account originating from an OAuth callback.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub user_name: Option<String>,
}

// =============================================================================
// SESSION ENTITY
// =============================================================================

/// A single outstanding refresh token, tracked durably.
///
/// `id` doubles as the JWT `sid` claim for every access/refresh token minted
/// under this session. `token` is the literal refresh-token string - not a
/// hash - and carries a unique index so at most one session can exist per
/// issued refresh token at a time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// OAUTH ACCOUNT ENTITY
// =============================================================================

/// A linked third-party identity. Unique on `(provider, provider_id)` so the
/// same provider account can never be linked to two local users.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OAuthAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: OAuthProvider,
    pub provider_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOAuthAccount {
    pub user_id: Uuid,
    pub provider: OAuthProvider,
    pub provider_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

// =============================================================================
// USER PROFILE ENTITY
// =============================================================================

/// Optional 1:1 extension of [`User`] carrying display fields. Orthogonal to
/// authentication correctness - created lazily on first profile write.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website_url: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// EMAIL VERIFICATION ENTITY
// =============================================================================

/// An email-confirmation token. Considered expired once `now - created_at`
/// exceeds 24 hours (checked by the credential engine at verification time,
/// not stored as a separate `expires_at` column).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EmailVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailVerification {
    pub const VALIDITY_HOURS: i64 = 24;

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) > chrono::Duration::hours(Self::VALIDITY_HOURS)
    }
}

#[derive(Debug, Clone)]
pub struct NewEmailVerification {
    pub user_id: Uuid,
    pub token: String,
}

// =============================================================================
// PASSWORD RESET ENTITY
// =============================================================================

/// A password-reset token, valid for one hour from issue and single-use.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PasswordReset {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewPasswordReset {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_oauth_provider_from_str() {
        assert_eq!(OAuthProvider::from_str("Google"), Some(OAuthProvider::Google));
        assert_eq!(OAuthProvider::from_str("GITHUB"), Some(OAuthProvider::Github));
        assert_eq!(OAuthProvider::from_str("twitter"), None);
    }

    #[test]
    fn test_user_has_password() {
        let mut user = fixture_user();
        user.password_hash = Some("$argon2id$...".to_string());
        assert!(user.has_password());

        user.password_hash = None;
        assert!(!user.has_password());
    }

    #[test]
    fn test_email_verification_expiry() {
        let now = Utc::now();
        let verification = EmailVerification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "tok".to_string(),
            verified: false,
            verified_at: None,
            created_at: now - chrono::Duration::hours(25),
        };
        assert!(verification.is_expired(now));

        let fresh = EmailVerification { created_at: now - chrono::Duration::hours(1), ..verification };
        assert!(!fresh.is_expired(now));
    }

    #[test]
    fn test_password_reset_validity() {
        let now = Utc::now();
        let reset = PasswordReset {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "tok".to_string(),
            expires_at: now + chrono::Duration::minutes(30),
            used: false,
            used_at: None,
            created_at: now,
        };
        assert!(reset.is_valid(now));

        let used = PasswordReset { used: true, ..reset.clone() };
        assert!(!used.is_valid(now));

        let expired = PasswordReset { expires_at: now - chrono::Duration::minutes(1), ..reset };
        assert!(!expired.is_valid(now));
    }

    fn fixture_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: None,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            user_name: None,
            role: Role::User,
            email_verified: false,
            is_active: true,
            is_suspended: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
