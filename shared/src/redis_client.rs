//! # Redis Client for Caching and Session Management
//!
//! High-level Redis client for caching, lockouts, token-family heads, session
//! metadata, and one-shot nonces (CSRF, OAuth state).
//!
//! ## Why Redis?
//!
//! Redis is an in-memory data store used for:
//!
//! | Use Case | Description |
//! |----------|-------------|
//! | **User cache** | Read-through cache for `User` by id |
//! | **Lockout** | Failed-login counters and lockout windows |
//! | **Token families** | Refresh-token rotation head tracking |
//! | **Session metadata** | Transport info (ip/ua/last-seen) for sessions |
//! | **One-shot nonces** | CSRF tokens, OAuth state parameters |
//!
//! ## Connection Management
//!
//! We use a `ConnectionManager` which automatically reconnects on failure.
//! This is more resilient than a simple connection for long-running services.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Redis Client                                   │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │  ┌──────────────────┐                                             │
//! │  │ ConnectionManager │ ──── Auto-reconnect on failure             │
//! │  └────────┬─────────┘                                             │
//! │           │                                                        │
//! │           ▼                                                        │
//! │  ┌─────────────────┐                                              │
//! │  │   Redis Server   │                                              │
//! │  └─────────────────┘                                              │
//! │                                                                    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Naming Convention
//!
//! | Pattern | TTL | Authoritative for |
//! |---------|-----|--------------------|
//! | `user:{id}` | 1h | nothing (read-through cache only) |
//! | `login_attempts:{email}` | 1h / 30m once locked | failed-attempt counter |
//! | `login_attempts:{email}:lock` | 30m | lockout expiry, set once the counter crosses the threshold |
//! | `token_family:{familyId}` | 7d | the current head of a refresh-token family |
//! | `session_meta:{sessionId}` | 7d | transport metadata (ip/ua/last-seen) |
//! | `csrf:{token}` | 24h | CSRF token validity |
//! | `oauth:state:{nonce}` | 10m | pending OAuth authorization requests |
//!
//! All of the above except the user cache are authoritative: losing them
//! changes behavior (a lost lockout record unlocks early, a lost family head
//! disables reuse detection) rather than merely causing a cache miss. Every
//! write here is still treated as best-effort by callers - a Redis outage
//! must never prevent the durable-store operation it accompanies from
//! succeeding.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::redis_client::RedisClient;
//! use shared::config::AppConfig;
//!
//! let config = AppConfig::from_env()?;
//! let redis = RedisClient::new(&config.redis).await?;
//!
//! // Generic, TTL'd, JSON-serialized storage
//! redis.set("key", &"value", Some(Duration::from_secs(3600))).await?;
//! let value: Option<String> = redis.get("key").await?;
//! ```
//!
//! ## Related Documentation
//!
//! - [`crate::config::RedisConfig`] - Connection configuration
//! - [`crate::auth::jwt`] - JWT token management

use crate::config::RedisConfig;
use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

// =============================================================================
// Ephemeral Value Shapes
// =============================================================================

/// Composed view over `login_attempts:{email}` (a raw `INCR` counter) and
/// `login_attempts:{email}:lock` (set once the counter crosses the
/// threshold). The two-key split is what lets the counter increment stay a
/// single atomic `INCR` instead of a read-modify-write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempts {
    /// Number of consecutive failed attempts recorded so far.
    pub attempts: u32,
    /// Present once the threshold has been crossed; login attempts for this
    /// identifier are rejected without touching the database until this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
}

/// Value stored at `token_family:{familyId}` - the current head of a
/// refresh-token rotation chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenFamilyHead {
    /// The most recently issued refresh token string for this family.
    pub current_token: String,
    /// Owning user, carried so reuse handling doesn't need a second lookup.
    pub user_id: uuid::Uuid,
}

/// Value stored at `session_meta:{sessionId}` - transport metadata that
/// accompanies a Session row without living in the relational schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Client IP at session creation or last refresh.
    pub ip: Option<String>,
    /// User-Agent header at session creation or last refresh.
    pub user_agent: Option<String>,
    /// Last time this session was used to mint or refresh a token.
    pub last_used_at: DateTime<Utc>,
    /// Time of the original login that created this session.
    pub last_login_at: DateTime<Utc>,
    /// `"password"`, `"google"`, or `"github"`.
    pub login_method: String,
}

/// Value stored at `oauth:state:{nonce}` while an authorization request is
/// outstanding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    /// Provider this state nonce was issued for.
    pub provider: String,
    /// When the authorization URL was generated.
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Redis Client
// =============================================================================

/// Async Redis client with automatic reconnection.
///
/// This client wraps a `ConnectionManager` which handles connection
/// failures automatically. It's safe to clone and share across tasks.
///
/// ## Thread Safety
///
/// The client is `Clone + Send + Sync`. Cloning is cheap (just an Arc clone).
/// Each operation uses an async connection from the manager.
#[derive(Clone)]
pub struct RedisClient {
    /// Connection manager for automatic reconnection
    conn: ConnectionManager,
}

impl RedisClient {
    /// Creates a new Redis client and establishes connection.
    ///
    /// ## Parameters
    ///
    /// - `config`: Redis configuration (URL, pool size)
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::RedisError` if:
    /// - URL is invalid
    /// - Redis server is unreachable
    /// - Authentication fails
    pub async fn new(config: &RedisConfig) -> Result<Self, ApiError> {
        info!(url = %config.url, "Connecting to Redis");

        let client = redis::Client::open(config.url.as_str()).map_err(ApiError::RedisError)?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(ApiError::RedisError)?;

        info!("Redis connection established");

        Ok(Self { conn })
    }

    // =========================================================================
    // Basic Operations
    // =========================================================================

    /// Stores a value with optional TTL (Time To Live).
    ///
    /// The value is serialized to JSON before storage.
    pub async fn set<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), ApiError> {
        let serialized = serde_json::to_string(value)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                conn.set_ex::<_, _, ()>(key, &serialized, duration.as_secs())
                    .await
                    .map_err(ApiError::RedisError)?;
            }
            None => {
                conn.set::<_, _, ()>(key, &serialized)
                    .await
                    .map_err(ApiError::RedisError)?;
            }
        }

        Ok(())
    }

    /// Retrieves and deserializes a value.
    ///
    /// ## Returns
    ///
    /// - `Ok(Some(value))` - Key exists and was deserialized
    /// - `Ok(None)` - Key doesn't exist
    /// - `Err(...)` - Redis error or deserialization failed
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        let mut conn = self.conn.clone();

        let value: Option<String> = conn.get(key).await.map_err(ApiError::RedisError)?;

        match value {
            Some(s) => {
                let deserialized = serde_json::from_str(&s)
                    .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    /// Deletes a key.
    ///
    /// ## Returns
    ///
    /// - `true` - Key was deleted
    /// - `false` - Key didn't exist
    pub async fn delete(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await.map_err(ApiError::RedisError)?;
        Ok(deleted > 0)
    }

    /// Checks if a key exists.
    pub async fn exists(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(ApiError::RedisError)
    }

    /// Increments a counter (atomic operation).
    ///
    /// Creates the key with value 1 if it doesn't exist.
    ///
    /// ## Returns
    ///
    /// The new value after incrementing.
    pub async fn incr(&self, key: &str) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await.map_err(ApiError::RedisError)
    }

    /// Sets TTL on an existing key.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl.as_secs() as i64)
            .await
            .map_err(ApiError::RedisError)
    }

    /// Health check - verifies Redis is responding.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(ApiError::RedisError)?;
        Ok(())
    }

    // =========================================================================
    // User Read-Through Cache
    // =========================================================================

    /// Caches a serializable user-shaped value at `user:{id}` for 1 hour.
    ///
    /// Call this on a cache miss after loading from the durable store, and
    /// again after any mutation to keep the cache warm with fresh data.
    pub async fn cache_user<T: serde::Serialize>(&self, user_id: uuid::Uuid, value: &T) -> Result<(), ApiError> {
        let key = format!("user:{}", user_id);
        self.set(&key, value, Some(Duration::from_secs(3600))).await
    }

    /// Reads a cached user. `None` on a miss - callers must fall through to
    /// the durable store and are expected to re-populate via `cache_user`.
    pub async fn get_cached_user<T: serde::de::DeserializeOwned>(
        &self,
        user_id: uuid::Uuid,
    ) -> Result<Option<T>, ApiError> {
        let key = format!("user:{}", user_id);
        self.get(&key).await
    }

    /// Invalidates the cached user. Must be called before returning success
    /// from any operation that mutates the user's row, or a stale cache
    /// entry could authorize against an outdated role or password.
    pub async fn invalidate_user_cache(&self, user_id: uuid::Uuid) -> Result<(), ApiError> {
        let key = format!("user:{}", user_id);
        self.delete(&key).await?;
        Ok(())
    }

    // =========================================================================
    // Login Lockout
    // =========================================================================

    const MAX_ATTEMPTS: u32 = 5;
    const LOCKOUT_DURATION: Duration = Duration::from_secs(30 * 60);
    const ATTEMPT_WINDOW: Duration = Duration::from_secs(60 * 60);

    /// Reads the current lockout record for an email, if any.
    ///
    /// A missing counter means no recent failed attempts. Callers should
    /// treat a Redis failure here as fail-open (skip the lockout check,
    /// log a warning) rather than blocking login.
    pub async fn get_login_attempts(&self, email: &str) -> Result<Option<LoginAttempts>, ApiError> {
        let mut conn = self.conn.clone();
        let attempts: Option<i64> = conn.get(Self::login_attempts_key(email)).await.map_err(ApiError::RedisError)?;
        let Some(attempts) = attempts else {
            return Ok(None);
        };

        let locked_until: Option<DateTime<Utc>> = self.get(&Self::lockout_key(email)).await?;

        Ok(Some(LoginAttempts { attempts: attempts.max(0) as u32, locked_until }))
    }

    /// Records a failed login attempt and returns the updated record.
    ///
    /// The count itself comes from `INCR`, not a get-then-set: two failed
    /// logins racing on the same key can't land on the same pre-increment
    /// value and lose an attempt, which a read-modify-write would allow.
    /// Only the call that observes the counter at exactly 1 starts the
    /// rolling attempt window, since it's the only one that can know it was
    /// the first write after the key didn't exist. On the attempt that
    /// pushes the count to [`MAX_ATTEMPTS`](Self::MAX_ATTEMPTS) or beyond, a
    /// separate `locked_until` key is written with a 30m TTL and the counter
    /// key's TTL is extended to match.
    pub async fn record_failed_login(&self, email: &str) -> Result<LoginAttempts, ApiError> {
        let key = Self::login_attempts_key(email);
        let attempts = self.incr(&key).await?;
        if attempts == 1 {
            self.expire(&key, Self::ATTEMPT_WINDOW).await?;
        }
        let attempts = attempts.max(0) as u32;

        let locked_until = if attempts >= Self::MAX_ATTEMPTS {
            let until = Utc::now() + chrono::Duration::from_std(Self::LOCKOUT_DURATION).unwrap();
            self.set(&Self::lockout_key(email), &until, Some(Self::LOCKOUT_DURATION)).await?;
            self.expire(&key, Self::LOCKOUT_DURATION).await?;
            Some(until)
        } else {
            None
        };

        Ok(LoginAttempts { attempts, locked_until })
    }

    /// Clears the lockout record for an email (call after a successful login).
    pub async fn reset_login_attempts(&self, email: &str) -> Result<(), ApiError> {
        self.delete(&Self::login_attempts_key(email)).await?;
        self.delete(&Self::lockout_key(email)).await?;
        Ok(())
    }

    fn login_attempts_key(email: &str) -> String {
        format!("login_attempts:{}", email)
    }

    fn lockout_key(email: &str) -> String {
        format!("login_attempts:{}:lock", email)
    }

    // =========================================================================
    // Refresh Token Family Heads
    // =========================================================================

    /// Writes the current head of a refresh-token family, TTL 7 days.
    pub async fn set_token_family_head(
        &self,
        family_id: uuid::Uuid,
        head: &TokenFamilyHead,
    ) -> Result<(), ApiError> {
        let key = format!("token_family:{}", family_id);
        self.set(&key, head, Some(Duration::from_secs(7 * 24 * 3600))).await
    }

    /// Reads the current head of a refresh-token family, if the ephemeral
    /// store still holds it.
    pub async fn get_token_family_head(&self, family_id: uuid::Uuid) -> Result<Option<TokenFamilyHead>, ApiError> {
        let key = format!("token_family:{}", family_id);
        self.get(&key).await
    }

    /// Deletes a family head. Called on reuse detection and on full
    /// revocation of a family.
    pub async fn delete_token_family_head(&self, family_id: uuid::Uuid) -> Result<(), ApiError> {
        let key = format!("token_family:{}", family_id);
        self.delete(&key).await?;
        Ok(())
    }

    // =========================================================================
    // Session Metadata
    // =========================================================================

    /// Writes session transport metadata, TTL 7 days (matches refresh TTL).
    pub async fn set_session_meta(&self, session_id: uuid::Uuid, meta: &SessionMeta) -> Result<(), ApiError> {
        let key = format!("session_meta:{}", session_id);
        self.set(&key, meta, Some(Duration::from_secs(7 * 24 * 3600))).await
    }

    /// Reads session metadata. Missing metadata is not an error - callers
    /// null out the transport fields and keep the session usable.
    pub async fn get_session_meta(&self, session_id: uuid::Uuid) -> Result<Option<SessionMeta>, ApiError> {
        let key = format!("session_meta:{}", session_id);
        self.get(&key).await
    }

    /// Deletes session metadata. Called alongside Session row deletion.
    pub async fn delete_session_meta(&self, session_id: uuid::Uuid) -> Result<(), ApiError> {
        let key = format!("session_meta:{}", session_id);
        self.delete(&key).await?;
        Ok(())
    }

    // =========================================================================
    // CSRF Tokens
    // =========================================================================

    /// Issues a CSRF token record with a 24-hour TTL. The token string
    /// itself is generated by the caller (see `auth_service::csrf`).
    pub async fn store_csrf_token(&self, token: &str) -> Result<(), ApiError> {
        let key = format!("csrf:{}", token);
        self.set(&key, &Utc::now(), Some(Duration::from_secs(24 * 3600))).await
    }

    /// Validates a CSRF token by existence alone - CSRF tokens are not
    /// bound to a user identity.
    pub async fn csrf_token_exists(&self, token: &str) -> Result<bool, ApiError> {
        let key = format!("csrf:{}", token);
        self.exists(&key).await
    }

    // =========================================================================
    // OAuth State Nonces
    // =========================================================================

    /// Writes a one-shot OAuth state nonce, TTL 10 minutes.
    pub async fn set_oauth_state(&self, nonce: &str, state: &OAuthState) -> Result<(), ApiError> {
        let key = format!("oauth:state:{}", nonce);
        self.set(&key, state, Some(Duration::from_secs(10 * 60))).await
    }

    /// Reads and deletes an OAuth state nonce in one step ("consume"),
    /// enforcing single use. Returns `None` if the nonce was never issued,
    /// already consumed, or has expired.
    pub async fn consume_oauth_state(&self, nonce: &str) -> Result<Option<OAuthState>, ApiError> {
        let key = format!("oauth:state:{}", nonce);
        let state: Option<OAuthState> = self.get(&key).await?;
        if state.is_some() {
            self.delete(&key).await?;
        }
        Ok(state)
    }
}

// Hide internal state in Debug output
impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_attempts_key_format() {
        assert_eq!(
            RedisClient::login_attempts_key("user@example.com"),
            "login_attempts:user@example.com"
        );
    }

    #[test]
    fn test_lockout_key_is_distinct_from_counter_key() {
        let email = "user@example.com";
        assert_eq!(RedisClient::lockout_key(email), "login_attempts:user@example.com:lock");
        assert_ne!(RedisClient::lockout_key(email), RedisClient::login_attempts_key(email));
    }

    #[test]
    fn test_login_attempts_serde_roundtrip() {
        let record = LoginAttempts { attempts: 3, locked_until: None };
        let json = serde_json::to_string(&record).unwrap();
        let back: LoginAttempts = serde_json::from_str(&json).unwrap();
        assert_eq!(back.attempts, 3);
        assert!(back.locked_until.is_none());
    }

    #[test]
    fn test_token_family_head_serde_roundtrip() {
        let head = TokenFamilyHead {
            current_token: "abc123".to_string(),
            user_id: uuid::Uuid::new_v4(),
        };
        let json = serde_json::to_string(&head).unwrap();
        let back: TokenFamilyHead = serde_json::from_str(&json).unwrap();
        assert_eq!(back.current_token, head.current_token);
        assert_eq!(back.user_id, head.user_id);
    }

    #[test]
    fn test_session_meta_serde_roundtrip() {
        let meta = SessionMeta {
            ip: Some("127.0.0.1".to_string()),
            user_agent: Some("curl/8.0".to_string()),
            last_used_at: Utc::now(),
            last_login_at: Utc::now(),
            login_method: "password".to_string(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: SessionMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.login_method, "password");
    }
}
