//! # JWT Token Service
//!
//! Handles generation and validation of JSON Web Tokens (JWT) for authentication.
//!
//! ## What is JWT?
//!
//! JWT (JSON Web Token) is an open standard ([RFC 7519](https://tools.ietf.org/html/rfc7519))
//! for securely transmitting information between parties as a JSON object. This information
//! can be verified because it is digitally signed.
//!
//! ## Token Structure
//!
//! A JWT consists of three parts separated by dots:
//!
//! ```text
//! xxxxx.yyyyy.zzzzz
//! ├────┼─────┼────┤
//! │    │     │    └── Signature (verifies integrity)
//! │    │     └─────── Payload (claims - the actual data)
//! │    └───────────── Header (algorithm and token type)
//! ```
//!
//! ## Our Token Implementation
//!
//! We use two types of tokens, each signed with its **own** secret so that
//! a compromised refresh secret can never be used to mint access tokens:
//!
//! | Token Type | TTL | Signed with | Purpose |
//! |------------|-----|-------------|---------|
//! | Access Token | 15 min | `access_secret` | API authorization |
//! | Refresh Token | 7 days | `refresh_secret` | Obtain new access token, rotate family |
//!
//! ## Claims (Token Payload)
//!
//! Our tokens contain these claims:
//!
//! | Claim | Description | Example |
//! |-------|-------------|---------|
//! | `sub` | Subject (user ID) | `550e8400-e29b-...` |
//! | `email` | User's email | `user@example.com` |
//! | `role` | User's role | `user` or `admin` |
//! | `iss` | Issuer | `identity-service` |
//! | `aud` | Audience | `identity-service-api` |
//! | `exp` | Expiration time | Unix timestamp |
//! | `iat` | Issued at | Unix timestamp |
//! | `jti` | JWT ID (unique) | UUID |
//! | `sid` | Session ID this token belongs to | UUID |
//! | `fid` | Refresh token family ID (rotation chain) | UUID |
//! | `type` | Token type | `access` or `refresh` |
//!
//! ## Security Notes
//!
//! - We use **HS256** (HMAC-SHA256) for signing
//! - Each secret must be at least 32 characters
//! - Tokens are validated for: signature, expiration, issuer, audience
//! - The `sid`/`fid` claims let the session and rotation engines bind a token
//!   to server-side state without a database round trip
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::auth::jwt::JwtService;
//! use shared::config::JwtConfig;
//!
//! let config = JwtConfig { /* ... */ };
//! let jwt_service = JwtService::new(config);
//!
//! let tokens = jwt_service.generate_tokens(user_id, "user@example.com", "user", session_id, family_id)?;
//! let claims = jwt_service.validate_access_token(&tokens.access_token)?;
//! let token = JwtService::extract_from_header("Bearer eyJhbGc...")?;
//! ```
//!
//! ## Related Documentation
//!
//! - [`crate::config::JwtConfig`] - Configuration options
//! - [`crate::auth::middleware`] - Request authentication

use crate::config::JwtConfig;
use crate::errors::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a cryptographically random, URL-safe token string with at
/// least 128 bits of entropy.
///
/// Used anywhere the spec calls for an opaque bearer value that isn't a
/// JWT: refresh-token-family ids, email-verification tokens, password-reset
/// tokens, and CSRF/OAuth-state nonces. 32 random bytes (256 bits) hex-encode
/// to a 64-character string that's safe to embed in a URL query parameter.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// =============================================================================
// Claims Structure
// =============================================================================

/// JWT Claims (token payload).
///
/// These are the data fields embedded in the token. All fields are verified
/// during token validation.
///
/// ## Standard Claims (RFC 7519)
///
/// - `sub`: Subject - identifies the principal (our user ID)
/// - `iss`: Issuer - who created the token
/// - `aud`: Audience - who the token is intended for
/// - `exp`: Expiration - when the token becomes invalid
/// - `iat`: Issued At - when the token was created
///
/// ## Custom Claims
///
/// - `email`: User's email for display/logging
/// - `role`: User's role for authorization
/// - `jti`: Unique token ID
/// - `sid`: Session this token belongs to
/// - `fid`: Refresh token family (rotation chain) this token belongs to
/// - `token_type`: Differentiates access from refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's unique identifier (UUID).
    pub sub: Uuid,

    /// User's email address.
    /// Included for convenience in logging and display.
    pub email: String,

    /// User's role for authorization decisions: `user` or `admin`.
    pub role: String,

    /// Issuer - identifies who created the token.
    pub iss: String,

    /// Audience - identifies who the token is intended for.
    pub aud: String,

    /// Expiration time as Unix timestamp (seconds since epoch).
    pub exp: i64,

    /// Issued at time as Unix timestamp.
    pub iat: i64,

    /// JWT ID - unique identifier for this specific token.
    pub jti: Uuid,

    /// Session this token authenticates. Stable across refresh rotations.
    pub sid: Uuid,

    /// Refresh token family this token belongs to. Every refresh token
    /// minted from the same login shares a family id; reuse of a rotated-out
    /// member is how the session engine detects token theft.
    pub fid: Uuid,

    /// Token type to distinguish access from refresh tokens.
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

// =============================================================================
// Token Type
// =============================================================================

/// Distinguishes between access and refresh tokens.
///
/// This is stored in the token itself to prevent misuse:
/// - Access tokens cannot be used to refresh
/// - Refresh tokens cannot be used for API access
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token for API authorization (default 15 min).
    Access,
    /// Long-lived token for obtaining new access tokens (default 7 days).
    Refresh,
}

// =============================================================================
// Token Pair
// =============================================================================

/// A pair of access and refresh tokens returned after login or refresh.
///
/// ## Client Handling
///
/// - **Access token**: Store in memory, send in `Authorization` header
/// - **Refresh token**: Store in HttpOnly cookie (browser) or secure storage (mobile)
///
/// ## Token Rotation
///
/// When refreshing, the client receives a new token pair sharing the same
/// `fid` (family). The old refresh token is marked rotated and any further
/// use of it is treated as reuse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// The access token for API authorization.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: String,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// Seconds until the refresh token expires.
    pub refresh_expires_in: i64,
}

// =============================================================================
// JWT Service
// =============================================================================

/// Service for JWT generation and validation.
///
/// This is the main entry point for all JWT operations. It should be
/// created once at startup and shared across the application.
///
/// ## Thread Safety
///
/// This type is `Clone` and can be wrapped in `Arc` for sharing across
/// async tasks. The underlying keys are immutable after construction.
#[derive(Clone)]
pub struct JwtService {
    /// Key for signing access tokens
    access_encoding_key: EncodingKey,
    /// Key for verifying access token signatures
    access_decoding_key: DecodingKey,
    /// Key for signing refresh tokens
    refresh_encoding_key: EncodingKey,
    /// Key for verifying refresh token signatures
    refresh_decoding_key: DecodingKey,
    /// Configuration with TTLs, issuer, audience
    config: JwtConfig,
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    ///
    /// ## Panics
    ///
    /// Does not panic. Invalid configuration will cause validation errors
    /// at runtime rather than construction time.
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding_key = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding_key = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding_key = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding_key = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        Self {
            access_encoding_key,
            access_decoding_key,
            refresh_encoding_key,
            refresh_decoding_key,
            config,
        }
    }

    /// Generates a token pair (access + refresh) for a user session.
    ///
    /// Called after successful authentication, or when rotating a refresh
    /// token. `session_id` is stable for the life of the session; `family_id`
    /// is stable for the life of the rotation chain (same as `session_id` for
    /// the first token pair issued on login).
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::InternalError` if token encoding fails
    /// (which shouldn't happen with valid configuration).
    pub fn generate_tokens(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
        session_id: Uuid,
        family_id: Uuid,
    ) -> Result<TokenPair, ApiError> {
        let access_token = self.generate_token(
            user_id,
            email,
            role,
            session_id,
            family_id,
            TokenType::Access,
        )?;
        let refresh_token = self.generate_token(
            user_id,
            email,
            role,
            session_id,
            family_id,
            TokenType::Refresh,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_ttl_seconds as i64,
            refresh_expires_in: self.config.refresh_token_ttl_seconds as i64,
        })
    }

    /// Generates a single token of the specified type.
    fn generate_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
        session_id: Uuid,
        family_id: Uuid,
        token_type: TokenType,
    ) -> Result<String, ApiError> {
        let now = Utc::now();

        let (ttl, encoding_key) = match token_type {
            TokenType::Access => (
                Duration::seconds(self.config.access_token_ttl_seconds as i64),
                &self.access_encoding_key,
            ),
            TokenType::Refresh => (
                Duration::seconds(self.config.refresh_token_ttl_seconds as i64),
                &self.refresh_encoding_key,
            ),
        };

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role: role.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            sid: session_id,
            fid: family_id,
            token_type,
        };

        encode(&Header::default(), &claims, encoding_key).map_err(|e| ApiError::InternalError {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validates and decodes an access token.
    ///
    /// ## Validation Steps
    ///
    /// 1. Verify signature with the access secret
    /// 2. Check expiration
    /// 3. Verify issuer and audience
    /// 4. Check token type (must be "access")
    ///
    /// ## Errors
    ///
    /// - `ApiError::TokenExpired` - Token has expired
    /// - `ApiError::InvalidToken` - Invalid signature, issuer, audience, or type
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.decode_token(token, &self.access_decoding_key)?;

        if claims.token_type != TokenType::Access {
            return Err(ApiError::InvalidToken);
        }

        Ok(claims)
    }

    /// Validates and decodes a refresh token against the refresh secret.
    ///
    /// ## Errors
    ///
    /// - `ApiError::TokenExpired` - Refresh token has expired
    /// - `ApiError::InvalidToken` - Invalid signature, issuer, audience, or type
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.decode_token(token, &self.refresh_decoding_key)?;

        if claims.token_type != TokenType::Refresh {
            return Err(ApiError::InvalidToken);
        }

        Ok(claims)
    }

    /// Decodes a token without checking the type, against the given key.
    fn decode_token(&self, token: &str, key: &DecodingKey) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let token_data: TokenData<Claims> =
            decode(token, key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }

    /// Extracts the token from an Authorization header.
    ///
    /// Expects the format: `Bearer <token>`
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::InvalidToken` if the header doesn't start with "Bearer "
    pub fn extract_from_header(auth_header: &str) -> Result<&str, ApiError> {
        auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::InvalidToken)
    }
}

// Implement Debug manually to avoid exposing keys
impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "test_access_secret_key_minimum_32_chars".to_string(),
            refresh_secret: "test_refresh_secret_key_minimum_32_chars_differs".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604800,
            issuer: "test-issuer".to_string(),
            audience: "test-audience".to_string(),
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();

        let tokens = service
            .generate_tokens(user_id, "test@example.com", "user", session_id, family_id)
            .unwrap();

        let claims = service.validate_access_token(&tokens.access_token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.sid, session_id);
        assert_eq!(claims.fid, family_id);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();

        let tokens = service
            .generate_tokens(user_id, "test@example.com", "admin", session_id, family_id)
            .unwrap();

        let claims = service.validate_refresh_token(&tokens.refresh_token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_access_token_fails_as_refresh() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();

        let tokens = service
            .generate_tokens(
                user_id,
                "test@example.com",
                "user",
                Uuid::new_v4(),
                Uuid::new_v4(),
            )
            .unwrap();

        // Signed with the access secret - refresh-secret validation must reject it outright
        let result = service.validate_refresh_token(&tokens.access_token);
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_refresh_token_fails_as_access() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();

        let tokens = service
            .generate_tokens(
                user_id,
                "test@example.com",
                "user",
                Uuid::new_v4(),
                Uuid::new_v4(),
            )
            .unwrap();

        let result = service.validate_access_token(&tokens.refresh_token);
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_cross_signed_token_is_rejected() {
        // A token signed with the refresh secret must never validate under the access key,
        // independent of the token_type claim it carries.
        let service = JwtService::new(test_config());
        let bad_key = EncodingKey::from_secret(test_config().refresh_secret.as_bytes());
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
            iss: "test-issuer".to_string(),
            aud: "test-audience".to_string(),
            exp: (now + Duration::seconds(900)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            sid: Uuid::new_v4(),
            fid: Uuid::new_v4(),
            token_type: TokenType::Access,
        };
        let forged = encode(&Header::default(), &claims, &bad_key).unwrap();

        let result = service.validate_access_token(&forged);
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_extract_from_header_valid() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let header = format!("Bearer {}", token);

        let extracted = JwtService::extract_from_header(&header).unwrap();
        assert_eq!(extracted, token);
    }

    #[test]
    fn test_extract_from_header_invalid() {
        let result = JwtService::extract_from_header("InvalidHeader token");
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_random_token_length_and_charset() {
        let token = random_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_token_uniqueness() {
        let a = random_token();
        let b = random_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_contains_unique_jti() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();

        let tokens1 = service
            .generate_tokens(user_id, "test@example.com", "user", session_id, family_id)
            .unwrap();
        let tokens2 = service
            .generate_tokens(user_id, "test@example.com", "user", session_id, family_id)
            .unwrap();

        let claims1 = service.validate_access_token(&tokens1.access_token).unwrap();
        let claims2 = service.validate_access_token(&tokens2.access_token).unwrap();

        assert_ne!(claims1.jti, claims2.jti);
        // Same session/family across both issuances
        assert_eq!(claims1.sid, claims2.sid);
        assert_eq!(claims1.fid, claims2.fid);
    }
}
