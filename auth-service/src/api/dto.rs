//! # Data Transfer Objects (DTOs)
//!
//! DTOs define the structure of data transferred between client and server.
//! They serve as the **API contract** and handle:
//!
//! - **Request validation**: Using the `validator` crate
//! - **Deserialization**: JSON → Rust structs via `serde`
//! - **Serialization**: Rust structs → JSON for responses
//!
//! ## JSON Naming Convention
//!
//! All DTOs use `camelCase` for JSON serialization to match JavaScript
//! conventions on the frontend.
//!
//! Success responses are the plain per-endpoint DTO below, not wrapped in a
//! generic envelope - see `DESIGN.md` for why. Error responses use
//! [`shared::errors::ErrorResponse`] instead, which already carries a stable
//! `code` your clients can switch on.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    domain::{User, UserProfile},
    service::session_service::SessionInfo,
};

// =============================================================================
// REGISTRATION
// =============================================================================

/// Request body for user registration.
///
/// # Example JSON
///
/// ```json
/// {
///   "email": "user@example.com",
///   "password": "SecurePass123!",
///   "firstName": "John",
///   "lastName": "Doe",
///   "userName": "johnd"
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email too long"))]
    pub email: String,

    /// Plain text password. Actual strength rules live in
    /// [`shared::auth::password::PasswordValidator`]; this is just a cheap
    /// upper/lower bound before it reaches the engine.
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    /// Optional handle, unique when present.
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub user_name: Option<String>,
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// =============================================================================
// TOKEN REFRESH / LOGOUT
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

// =============================================================================
// EMAIL VERIFICATION / PASSWORD RESET / CHANGE
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Request body for changing the password of the currently authenticated
/// user. Unlike [`ResetPasswordRequest`], this requires knowing the current
/// password rather than a mailed token.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

// =============================================================================
// RESPONSE TYPES - AUTH / TOKENS
// =============================================================================

/// Response containing authentication tokens and the authenticated user.
///
/// Returned on successful registration, login, or OAuth callback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponseDto {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserDto,
}

/// Response containing only tokens (for the refresh endpoint).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponseDto {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// A user as presented to the client - safe subset of [`User`] plus
/// whatever [`UserProfile`] display fields exist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub role: String,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: String,
}

impl UserDto {
    /// Builds a [`UserDto`] from the domain [`User`] alone, leaving the
    /// profile-only fields empty. Used wherever a profile lookup would be
    /// an unnecessary extra round trip (registration, login, refresh).
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_name: user.user_name.clone(),
            role: user.role.as_str().to_string(),
            email_verified: user.email_verified,
            display_name: None,
            bio: None,
            avatar_url: None,
            created_at: user.created_at.to_rfc3339(),
        }
    }

    /// Builds a [`UserDto`] merging in the optional profile's display
    /// fields. Used by `/auth/me`, the one place a profile is worth the
    /// extra query.
    pub fn from_user_and_profile(user: &User, profile: Option<&UserProfile>) -> Self {
        let mut dto = Self::from_user(user);
        if let Some(profile) = profile {
            dto.display_name = profile.display_name.clone();
            dto.bio = profile.bio.clone();
            dto.avatar_url = profile.avatar_url.clone();
        }
        dto
    }
}

/// Generic message response for simple confirmations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

// =============================================================================
// RESPONSE TYPES - CSRF
// =============================================================================

/// Returned by `GET /auth/csrf-token`. The same value is also echoed in an
/// `X-CSRF-Token` response header so clients can read it without parsing
/// the body if they'd rather not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

// =============================================================================
// RESPONSE TYPES - OAUTH
// =============================================================================

/// Returned by `GET /auth/oauth/{provider}` - the URL the client should
/// redirect the user to in order to start the provider's consent flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthAuthUrlResponse {
    pub auth_url: String,
}

/// Returned by `GET /auth/oauth/linked`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProvidersResponse {
    pub providers: Vec<String>,
}

// =============================================================================
// RESPONSE TYPES - SESSIONS
// =============================================================================

/// Returned by `GET /sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsResponse {
    pub sessions: Vec<SessionInfo>,
}

/// Returned by `DELETE /sessions/other`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedSessionsResponse {
    pub revoked_count: u64,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use validator::Validate;

    fn fixture_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: None,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            user_name: Some("testuser".to_string()),
            role: crate::domain::Role::User,
            email_verified: true,
            is_active: true,
            is_suspended: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_register_request_valid() {
        let request = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            user_name: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_register_request_invalid_email() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "password123".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            user_name: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_short_password() {
        let request = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "short".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            user_name: None,
        };
        let result = request.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().field_errors().contains_key("password"));
    }

    #[test]
    fn test_login_request_valid() {
        let request = LoginRequest { email: "test@example.com".to_string(), password: "password".to_string() };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_change_password_request_valid() {
        let request = ChangePasswordRequest {
            current_password: "oldpass123".to_string(),
            new_password: "NewSecurePass123!".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_user_dto_from_user_omits_profile_fields() {
        let user = fixture_user();
        let dto = UserDto::from_user(&user);
        assert_eq!(dto.id, user.id.to_string());
        assert_eq!(dto.role, "user");
        assert!(dto.display_name.is_none());
    }

    #[test]
    fn test_user_dto_merges_profile() {
        let user = fixture_user();
        let profile = UserProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            display_name: Some("Testy".to_string()),
            bio: Some("hello".to_string()),
            avatar_url: None,
            website_url: None,
            location: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let dto = UserDto::from_user_and_profile(&user, Some(&profile));
        assert_eq!(dto.display_name.as_deref(), Some("Testy"));
        assert_eq!(dto.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn test_message_response_new() {
        let response = MessageResponse::new("Test message");
        assert_eq!(response.message, "Test message");
    }

    #[test]
    fn test_json_serialization_camel_case() {
        let response = CsrfTokenResponse { csrf_token: "abc".to_string() };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("csrfToken"));
    }
}
