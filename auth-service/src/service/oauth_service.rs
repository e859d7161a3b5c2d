//! # OAuth Engine
//!
//! Authorization-code flow against Google and GitHub: builds the
//! authorization URL behind a CSRF-bound one-time state nonce, exchanges the
//! callback code for a provider access token, and links or creates the
//! local [`User`] that token belongs to.
//!
//! New users created through this flow are considered verified on arrival -
//! the provider already vouched for the email address, so there is no
//! separate email-verification step for OAuth-originated accounts.

use async_trait::async_trait;
use serde::Deserialize;
use shared::{
    config::{OAuthConfig, OAuthProviderConfig},
    errors::ApiError,
    redis_client::{OAuthState, RedisClient},
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{EventEmitter, NewOAuthAccount, NewUser, OAuthProvider, SecurityEvent, User},
    repository::{OAuthRepository, UserRepository},
};

/// Profile fields pulled from a provider's userinfo endpoint, normalized to
/// a common shape across Google and GitHub.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub provider_user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A provider-specific OAuth2 client: exchanges an authorization code for an
/// access token, then trades that token for a normalized profile. Kept as a
/// trait so the engine can be exercised against a double in tests instead of
/// making real HTTP calls to Google or GitHub.
#[async_trait]
pub trait OAuthProviderClient: Send + Sync {
    fn authorization_endpoint(&self) -> String;
    fn client_id(&self) -> &str;
    fn redirect_uri(&self) -> &str;
    fn scope(&self) -> &str;

    async fn exchange_code(&self, code: &str) -> Result<String, ApiError>;
    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, ApiError>;
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    given_name: Option<String>,
    family_name: Option<String>,
}

pub struct GoogleOAuthClient {
    config: OAuthProviderConfig,
    http: reqwest::Client,
}

impl GoogleOAuthClient {
    pub fn new(config: OAuthProviderConfig) -> Self {
        Self { config, http: reqwest::Client::new() }
    }
}

#[async_trait]
impl OAuthProviderClient for GoogleOAuthClient {
    fn authorization_endpoint(&self) -> String {
        "https://accounts.google.com/o/oauth2/v2/auth".to_string()
    }

    fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    fn scope(&self) -> &str {
        "openid email profile"
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "google-oauth".to_string() })?;

        let body: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "google-oauth".to_string() })?;

        Ok(body.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, ApiError> {
        let response = self
            .http
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "google-oauth".to_string() })?;

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "google-oauth".to_string() })?;

        Ok(OAuthProfile {
            provider_user_id: info.id,
            email: info.email,
            first_name: info.given_name.unwrap_or_default(),
            last_name: info.family_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    name: Option<String>,
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
}

pub struct GithubOAuthClient {
    config: OAuthProviderConfig,
    http: reqwest::Client,
}

impl GithubOAuthClient {
    pub fn new(config: OAuthProviderConfig) -> Self {
        Self { config, http: reqwest::Client::new() }
    }
}

#[async_trait]
impl OAuthProviderClient for GithubOAuthClient {
    fn authorization_endpoint(&self) -> String {
        "https://github.com/login/oauth/authorize".to_string()
    }

    fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    fn scope(&self) -> &str {
        "read:user user:email"
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post("https://github.com/login/oauth/access_token")
            .header("Accept", "application/json")
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
            ])
            .send()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "github-oauth".to_string() })?;

        let body: GithubTokenResponse = response
            .json()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "github-oauth".to_string() })?;

        Ok(body.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, ApiError> {
        let user: GithubUser = self
            .http
            .get("https://api.github.com/user")
            .bearer_auth(access_token)
            .header("User-Agent", "auth-service")
            .send()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "github-oauth".to_string() })?
            .json()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "github-oauth".to_string() })?;

        let emails: Vec<GithubEmail> = self
            .http
            .get("https://api.github.com/user/emails")
            .bearer_auth(access_token)
            .header("User-Agent", "auth-service")
            .send()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "github-oauth".to_string() })?
            .json()
            .await
            .map_err(|_| ApiError::ServiceUnavailable { service: "github-oauth".to_string() })?;

        let email = emails
            .into_iter()
            .find(|e| e.primary)
            .map(|e| e.email)
            .ok_or(ApiError::BadRequest { message: "github account has no primary email".to_string() })?;

        let full_name = user.name.unwrap_or_else(|| user.login.clone());
        let mut parts = full_name.splitn(2, ' ');
        let first_name = parts.next().unwrap_or(&user.login).to_string();
        let last_name = parts.next().unwrap_or("").to_string();

        Ok(OAuthProfile { provider_user_id: user.id.to_string(), email, first_name, last_name })
    }
}

/// Builds the provider clients configured for this deployment from
/// [`OAuthConfig`]. A provider without credentials configured is simply
/// absent from the map.
pub fn build_provider_clients(config: &OAuthConfig) -> Vec<(OAuthProvider, Arc<dyn OAuthProviderClient>)> {
    let mut clients: Vec<(OAuthProvider, Arc<dyn OAuthProviderClient>)> = Vec::new();

    if let Some(google) = &config.google {
        clients.push((OAuthProvider::Google, Arc::new(GoogleOAuthClient::new(google.clone()))));
    }
    if let Some(github) = &config.github {
        clients.push((OAuthProvider::Github, Arc::new(GithubOAuthClient::new(github.clone()))));
    }

    clients
}

#[derive(Clone)]
pub struct OAuthEngine {
    user_repository: UserRepository,
    oauth_repository: OAuthRepository,
    redis: RedisClient,
    events: Arc<dyn EventEmitter>,
    providers: Arc<Vec<(OAuthProvider, Arc<dyn OAuthProviderClient>)>>,
}

impl OAuthEngine {
    pub fn new(
        user_repository: UserRepository,
        oauth_repository: OAuthRepository,
        redis: RedisClient,
        events: Arc<dyn EventEmitter>,
        providers: Vec<(OAuthProvider, Arc<dyn OAuthProviderClient>)>,
    ) -> Self {
        Self { user_repository, oauth_repository, redis, events, providers: Arc::new(providers) }
    }

    fn client_for(&self, provider: OAuthProvider) -> Result<&Arc<dyn OAuthProviderClient>, ApiError> {
        self.providers
            .iter()
            .find(|(p, _)| *p == provider)
            .map(|(_, client)| client)
            .ok_or(ApiError::BadRequest { message: format!("oauth provider {} is not configured", provider.as_str()) })
    }

    /// Builds the provider's authorization URL, minting a CSRF-bound state
    /// nonce valid for 10 minutes.
    pub async fn authorization_url(&self, provider: OAuthProvider) -> Result<String, ApiError> {
        let client = self.client_for(provider)?;
        let nonce = shared::auth::random_token();

        self.redis
            .set_oauth_state(&nonce, &OAuthState { provider: provider.as_str().to_string(), timestamp: chrono::Utc::now() })
            .await?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            client.authorization_endpoint(),
            urlencoding::encode(client.client_id()),
            urlencoding::encode(client.redirect_uri()),
            urlencoding::encode(client.scope()),
            nonce,
        ))
    }

    /// Completes the callback: verifies the state nonce belongs to this
    /// provider and hasn't already been consumed, exchanges the code, and
    /// resolves the local user - linking to an existing account by email if
    /// one exists, or creating a brand-new verified account otherwise.
    /// Returns the user together with whether the account was just created.
    pub async fn handle_callback(&self, provider: OAuthProvider, code: &str, state: &str) -> Result<(User, bool), ApiError> {
        let stored_state = match self.redis.consume_oauth_state(state).await? {
            Some(state) => state,
            None => {
                self.events.emit(SecurityEvent::OAuthLoginFailed {
                    provider: provider.as_str(),
                    error: "invalid or expired oauth state parameter",
                });
                return Err(ApiError::InvalidToken);
            }
        };

        if stored_state.provider != provider.as_str() {
            self.events.emit(SecurityEvent::OAuthLoginFailed { provider: provider.as_str(), error: "provider mismatch" });
            return Err(ApiError::InvalidToken);
        }

        let client = self.client_for(provider)?;
        let access_token = client.exchange_code(code).await.map_err(|error| {
            self.events.emit(SecurityEvent::OAuthLoginFailed { provider: provider.as_str(), error: "code exchange failed" });
            error
        })?;
        let profile = client.fetch_profile(&access_token).await.map_err(|error| {
            self.events.emit(SecurityEvent::OAuthLoginFailed { provider: provider.as_str(), error: "profile fetch failed" });
            error
        })?;

        if let Some(account) = self.oauth_repository.find_by_provider_id(provider, &profile.provider_user_id).await? {
            let user = self
                .user_repository
                .find_by_id(account.user_id)
                .await?
                .ok_or(ApiError::NotFound { resource: "user".to_string() })?;

            return Ok((user, false));
        }

        let (user, is_new_user) = match self.user_repository.find_by_email(&profile.email).await? {
            Some(user) => {
                // An existing, unverified email must not be silently claimed
                // by whoever first completes an OAuth flow against it - that
                // would let an attacker take over an account by registering
                // the victim's not-yet-verified address with a provider.
                if !user.email_verified {
                    return Err(ApiError::BadRequest {
                        message: "verify your email address before linking an OAuth provider to this account".to_string(),
                    });
                }
                (user, false)
            }
            None => {
                let user = self
                    .user_repository
                    .create(NewUser {
                        email: profile.email.clone(),
                        password_hash: None,
                        first_name: profile.first_name.clone(),
                        last_name: profile.last_name.clone(),
                        user_name: None,
                    })
                    .await?;
                self.user_repository.set_email_verified(user.id, true).await?;
                (User { email_verified: true, ..user }, true)
            }
        };

        self.oauth_repository
            .create(NewOAuthAccount {
                user_id: user.id,
                provider,
                provider_id: profile.provider_user_id,
                access_token: Some(access_token),
                refresh_token: None,
            })
            .await?;

        self.events.emit(SecurityEvent::OAuthAccountLinked { user_id: user.id, provider: provider.as_str(), is_new_user });
        info!(user_id = %user.id, provider = provider.as_str(), is_new_user, "oauth account linked");

        Ok((user, is_new_user))
    }

    pub async fn linked_providers(&self, user_id: Uuid) -> Result<Vec<OAuthProvider>, ApiError> {
        let accounts = self.oauth_repository.find_all_for_user(user_id).await?;
        Ok(accounts.into_iter().map(|a| a.provider).collect())
    }

    /// Unlinks a provider, refusing to leave the account with no way to
    /// authenticate: a passwordless user must keep at least one linked
    /// provider.
    pub async fn unlink(&self, user_id: Uuid, provider: OAuthProvider) -> Result<(), ApiError> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound { resource: "user".to_string() })?;

        if !user.has_password() {
            let linked_count = self.oauth_repository.count_for_user(user_id).await?;
            if linked_count <= 1 {
                return Err(ApiError::BadRequest {
                    message: "cannot unlink the only sign-in method on an account without a password".to_string(),
                });
            }
        }

        self.oauth_repository.delete(user_id, provider).await?;
        self.events.emit(SecurityEvent::OAuthAccountUnlinked { user_id, provider: provider.as_str() });

        Ok(())
    }
}
