//! # Request Handlers
//!
//! HTTP request handlers that bridge the API layer with the engine layer.
//! Each handler follows the same shape:
//!
//! 1. **Extract** request data (JSON body, bearer token, path/query params)
//! 2. **Validate** input using the `validator` crate
//! 3. **Call** the relevant engine
//! 4. **Transform** the result into a response DTO
//!
//! ## Authentication
//!
//! Protected endpoints call [`authenticate`] to pull the bearer access
//! token out of the `Authorization` header and turn it into an
//! [`AuthenticatedUser`]. There's no wrapping auth middleware in front of
//! these routes - every handler that needs a user does this extraction
//! itself, the same way [`csrf_guard`] is called explicitly by every
//! mutating handler instead of living in a middleware layer.
//!
//! ## Error Handling
//!
//! All handlers return `Result<HttpResponse, ApiError>`. `ApiError`
//! converts to the appropriate HTTP status and JSON body via its
//! `ResponseError` implementation.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use shared::{auth::middleware::AuthenticatedUser, errors::ApiError, validation};
use tracing::info;
use uuid::Uuid;

use crate::{domain::OAuthProvider, AppState};

use super::dto::{
    AuthResponseDto, ChangePasswordRequest, CsrfTokenResponse, ForgotPasswordRequest, HealthResponse,
    LinkedProvidersResponse, LoginRequest, LogoutRequest, MessageResponse, OAuthAuthUrlResponse,
    RefreshTokenRequest, RegisterRequest, ResetPasswordRequest, RevokedSessionsResponse, SessionsResponse,
    TokenResponseDto, UserDto, VerifyEmailRequest,
};

// =============================================================================
// HEALTH CHECK
// =============================================================================

/// `GET /health`
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: "auth-service".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

// =============================================================================
// CSRF
// =============================================================================

/// Issues a CSRF token. No authentication required - this is the first call
/// a fresh client makes before registering or logging in.
///
/// `GET /api/v1/auth/csrf-token`
pub async fn issue_csrf_token(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let token = state.csrf_engine.generate_token().await?;

    Ok(HttpResponse::Ok()
        .insert_header(("X-CSRF-Token", token.clone()))
        .json(CsrfTokenResponse { csrf_token: token }))
}

/// Validates the `X-CSRF-Token` header against the issued-token store.
/// Called explicitly by every mutating handler below.
async fn csrf_guard(req: &HttpRequest, state: &AppState) -> Result<(), ApiError> {
    let token = req
        .headers()
        .get("X-CSRF-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::CsrfFailed { message: "missing X-CSRF-Token header".to_string() })?;

    state.csrf_engine.validate_token(token).await
}

// =============================================================================
// AUTHENTICATION HELPER
// =============================================================================

/// Extracts and validates the bearer access token, returning the
/// [`AuthenticatedUser`] it authenticates.
fn authenticate(req: &HttpRequest, state: &AppState) -> Result<AuthenticatedUser, ApiError> {
    let header = req.headers().get("Authorization").and_then(|h| h.to_str().ok()).ok_or(ApiError::MissingAuth)?;
    let token = shared::auth::jwt::JwtService::extract_from_header(header)?;
    let claims = state.jwt_service.validate_access_token(token)?;
    Ok(AuthenticatedUser::from(claims))
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// `POST /api/v1/auth/register`
pub async fn register(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let user = state
        .credential_engine
        .register(&body.email, &body.password, &body.first_name, &body.last_name, body.user_name)
        .await?;

    let ip = client_ip(&req);
    let user_agent = user_agent(&req);
    let (_, tokens) = state.session_engine.create_session(&user, ip, user_agent, "password").await?;

    let dto = AuthResponseDto {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens.expires_in,
        user: UserDto::from_user(&user),
    };

    Ok(HttpResponse::Created().json(dto))
}

// =============================================================================
// LOGIN
// =============================================================================

/// `POST /api/v1/auth/login`
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ip = client_ip(&req).and_then(|s| s.parse().ok());
    let user = state.credential_engine.login(&body.email, &body.password, ip).await?;

    let ip_str = client_ip(&req);
    let user_agent = user_agent(&req);
    let (_, tokens) = state.session_engine.create_session(&user, ip_str, user_agent, "password").await?;

    let dto = AuthResponseDto {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens.expires_in,
        user: UserDto::from_user(&user),
    };

    Ok(HttpResponse::Ok().json(dto))
}

// =============================================================================
// TOKEN REFRESH
// =============================================================================

/// `POST /api/v1/auth/refresh`
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    let tokens = state.session_engine.refresh(&body.refresh_token).await?;

    let dto = TokenResponseDto {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens.expires_in,
    };

    Ok(HttpResponse::Ok().json(dto))
}

// =============================================================================
// LOGOUT
// =============================================================================

/// `POST /api/v1/auth/logout`
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LogoutRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.session_engine.logout(&body.refresh_token).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Logged out successfully")))
}

// =============================================================================
// EMAIL VERIFICATION
// =============================================================================

/// `POST /api/v1/auth/verify-email`
pub async fn verify_email(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<VerifyEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.credential_engine.verify_email(&body.token).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Email verified successfully")))
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

/// `POST /api/v1/auth/forgot-password`
pub async fn forgot_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.credential_engine.request_password_reset(&body.email).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "If an account exists with this email, a password reset link has been sent",
    )))
}

/// `POST /api/v1/auth/reset-password`
pub async fn reset_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.credential_engine.reset_password(&body.token, &body.new_password).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Password reset successfully. Please log in with your new password.",
    )))
}

/// `POST /api/v1/auth/change-password`
pub async fn change_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;
    let user = authenticate(&req, &state)?;

    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.credential_engine.change_password(user.user_id, &body.current_password, &body.new_password).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Password changed successfully. Please log in again on your other devices.",
    )))
}

// =============================================================================
// CURRENT USER
// =============================================================================

/// `GET /api/v1/auth/me`
pub async fn get_profile(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let authed = authenticate(&req, &state)?;

    let user = state
        .user_cache
        .get(authed.user_id)
        .await?
        .ok_or(ApiError::NotFound { resource: "user".to_string() })?;

    let profile = state.profile_repository.find_by_user_id(authed.user_id).await?;

    Ok(HttpResponse::Ok().json(UserDto::from_user_and_profile(&user, profile.as_ref())))
}

// =============================================================================
// OAUTH
// =============================================================================

/// `GET /api/v1/auth/oauth/{provider}`
pub async fn oauth_authorize(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let provider = parse_provider(path.as_str())?;
    let auth_url = state.oauth_engine.authorization_url(provider).await?;

    Ok(HttpResponse::Ok().json(OAuthAuthUrlResponse { auth_url }))
}

#[derive(Debug, serde::Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: String,
}

/// `GET /api/v1/auth/oauth/{provider}/callback`
///
/// Unlike every other endpoint here, this one is a browser redirect target,
/// not a JSON API - the provider sends the user's browser here directly, so
/// the response has to be a redirect back into the frontend rather than a
/// JSON body. No CSRF token is required: the OAuth `state` nonce already
/// plays that role for this leg of the flow.
pub async fn oauth_callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<OAuthCallbackQuery>,
) -> Result<HttpResponse, ApiError> {
    let provider = parse_provider(path.as_str())?;
    let (user, is_new_user) = state.oauth_engine.handle_callback(provider, &query.code, &query.state).await?;

    let ip = client_ip(&req);
    let user_agent = user_agent(&req);
    let (_, tokens) = state.session_engine.create_session(&user, ip, user_agent, provider.as_str()).await?;

    info!(user_id = %user.id, is_new_user, provider = provider.as_str(), "oauth callback completed");

    let redirect_url = format!(
        "{}/oauth/callback?accessToken={}&refreshToken={}&isNewUser={}",
        state.frontend_url,
        urlencoding::encode(&tokens.access_token),
        urlencoding::encode(&tokens.refresh_token),
        is_new_user,
    );

    Ok(HttpResponse::Found().insert_header(("Location", redirect_url)).finish())
}

/// `GET /api/v1/auth/oauth/linked`
pub async fn oauth_linked(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = authenticate(&req, &state)?;
    let providers = state.oauth_engine.linked_providers(user.user_id).await?;

    Ok(HttpResponse::Ok().json(LinkedProvidersResponse {
        providers: providers.into_iter().map(|p| p.as_str().to_string()).collect(),
    }))
}

/// `DELETE /api/v1/auth/oauth/{provider}`
pub async fn oauth_unlink(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;
    let user = authenticate(&req, &state)?;

    let provider = parse_provider(path.as_str())?;
    state.oauth_engine.unlink(user.user_id, provider).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(format!("{} account unlinked", provider.as_str()))))
}

fn parse_provider(raw: &str) -> Result<OAuthProvider, ApiError> {
    OAuthProvider::from_str(raw).ok_or(ApiError::BadRequest { message: format!("unknown oauth provider: {}", raw) })
}

// =============================================================================
// SESSIONS
// =============================================================================

/// `GET /api/v1/sessions`
pub async fn list_sessions(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = authenticate(&req, &state)?;
    let sessions = state.session_engine.list_sessions(user.user_id, user.session_id).await?;

    Ok(HttpResponse::Ok().json(SessionsResponse { sessions }))
}

/// `DELETE /api/v1/sessions/other`
pub async fn revoke_other_sessions(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;
    let user = authenticate(&req, &state)?;

    let revoked_count = state.session_engine.revoke_other_sessions(user.user_id, user.session_id).await?;

    Ok(HttpResponse::Ok().json(RevokedSessionsResponse { revoked_count }))
}

/// `DELETE /api/v1/sessions/{id}`
pub async fn revoke_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    csrf_guard(&req, &state).await?;
    let user = authenticate(&req, &state)?;

    state.session_engine.revoke_session(user.user_id, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Session revoked")))
}

// =============================================================================
// HELPERS
// =============================================================================

fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info().peer_addr().map(String::from)
}

fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers().get("User-Agent").and_then(|v| v.to_str().ok()).map(String::from)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_known() {
        assert!(matches!(parse_provider("google"), Ok(OAuthProvider::Google)));
        assert!(matches!(parse_provider("GitHub"), Ok(OAuthProvider::Github)));
    }

    #[test]
    fn test_parse_provider_unknown() {
        assert!(parse_provider("twitter").is_err());
    }
}
