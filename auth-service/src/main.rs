//! # ACC LMS - Authentication Service
//!
//! The **auth-service** is a core microservice responsible for user authentication
//! and authorization in the ACC Learning Management System.
//!
//! ## Architecture Overview
//!
//! This service follows **Clean Architecture** principles with clear separation
//! between layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer (api/)                        │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐ │
//! │  │   routes    │  │  handlers   │  │    DTOs (Request/Res)   │ │
//! │  └──────┬──────┘  └──────┬──────┘  └────────────┬────────────┘ │
//! └─────────┼────────────────┼─────────────────────┼───────────────┘
//!           │                │                      │
//!           ▼                ▼                      ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Service Layer (service/)                     │
//! │  CredentialEngine │ SessionEngine │ OAuthEngine │ CsrfEngine    │
//! │  UserCache (read-through) │ sweeper (background)                │
//! └─────────────────────────────┼───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Repository Layer (repository/)                 │
//! │  User │ Session │ OAuth │ Profile │ EmailVerification │ PwReset │
//! └─────────────────────────────┼───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (domain/)                       │
//! │  ┌──────────────┐  ┌───────────────┐  ┌─────────────────────┐   │
//! │  │   Entities   │  │ Value Objects │  │   Domain Events     │   │
//! │  └──────────────┘  └───────────────┘  └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## API Endpoints
//!
//! All authentication endpoints are prefixed with `/api/v1`. See
//! [`api::routes`] for the full table.
//!
//! ## Security Features
//!
//! - **Password Hashing**: Argon2id with OWASP-recommended parameters
//! - **JWT Tokens**: Short-lived access tokens (15 min), longer refresh tokens (7 days)
//! - **Refresh Rotation**: reuse detection via per-session token families
//! - **Account Lockout**: Redis-backed, 5 attempts / 30 minute lockout
//! - **CSRF Tokens**: required on every state-changing endpoint
//! - **OAuth2**: Google and GitHub authorization-code flow with CSRF-bound state
//!
//! ## Configuration
//!
//! Environment variables are loaded via [`shared::config::AppConfig`].

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use shared::{
    auth::{jwt::JwtService, password::PasswordHasher},
    config::AppConfig,
    database,
    redis_client::RedisClient,
    tracing_config,
};
use std::sync::Arc;
use tracing::info;

mod api;
mod domain;
mod repository;
mod service;

use api::routes;
use domain::TracingEventEmitter;
use repository::{
    EmailVerificationRepository, OAuthRepository, PasswordResetRepository, ProfileRepository, SessionRepository,
    UserRepository,
};
use service::{
    credential_service::CredentialEngine, csrf_service::CsrfEngine, mailer::LoggingMailer,
    oauth_service::{build_provider_clients, OAuthEngine}, session_service::SessionEngine, sweeper, user_cache::UserCache,
};

/// Shared application state injected into all request handlers.
///
/// Wrapped in [`actix_web::web::Data`] and made available to every handler.
/// Each field is one of the four engines, plus the repositories and
/// services handlers need directly (profile lookups, JWT validation for
/// the manual bearer-token extraction every protected handler performs).
pub struct AppState {
    pub credential_engine: CredentialEngine,
    pub session_engine: SessionEngine,
    pub oauth_engine: OAuthEngine,
    pub csrf_engine: CsrfEngine,
    pub user_cache: UserCache,
    pub profile_repository: ProfileRepository,
    pub jwt_service: Arc<JwtService>,
    pub frontend_url: String,
}

/// Application entry point and server initialization.
///
/// # Initialization Sequence
///
/// 1. Load configuration from environment variables
/// 2. Initialize structured logging/tracing
/// 3. Create PostgreSQL connection pool
/// 4. Create Redis client for caching/sessions
/// 5. Instantiate repositories, then engines
/// 6. Spawn the background sweeper
/// 7. Configure and start HTTP server
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "Starting auth-service"
    );

    let db_pool = database::create_pool(&config.database).await.expect("Failed to create database pool");

    let redis_client = RedisClient::new(&config.redis).await.expect("Failed to connect to Redis");

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
    let password_hasher = Arc::new(PasswordHasher::new());
    let events: Arc<dyn domain::EventEmitter> = Arc::new(TracingEventEmitter);
    let mailer: Arc<dyn service::mailer::Mailer> = Arc::new(LoggingMailer::new(config.security.frontend_url.clone()));

    let user_repository = UserRepository::new(db_pool.clone());
    let profile_repository = ProfileRepository::new(db_pool.clone());
    let session_repository = SessionRepository::new(db_pool.clone());
    let oauth_repository = OAuthRepository::new(db_pool.clone());
    let email_verification_repository = EmailVerificationRepository::new(db_pool.clone());
    let password_reset_repository = PasswordResetRepository::new(db_pool.clone());

    let credential_engine = CredentialEngine::new(
        user_repository.clone(),
        profile_repository.clone(),
        email_verification_repository,
        password_reset_repository.clone(),
        session_repository.clone(),
        password_hasher,
        mailer,
        redis_client.clone(),
        events.clone(),
    );

    let session_engine =
        SessionEngine::new(session_repository.clone(), jwt_service.clone(), config.jwt.clone(), redis_client.clone(), events.clone());

    let providers = build_provider_clients(&config.oauth);
    let oauth_engine = OAuthEngine::new(user_repository.clone(), oauth_repository, redis_client.clone(), events, providers);

    let csrf_engine = CsrfEngine::new(redis_client.clone());
    let user_cache = UserCache::new(user_repository, redis_client);

    sweeper::spawn(session_repository, password_reset_repository);

    let app_state = web::Data::new(AppState {
        credential_engine,
        session_engine,
        oauth_engine,
        csrf_engine,
        user_cache,
        profile_repository,
        jwt_service,
        frontend_url: config.security.frontend_url.clone(),
    });

    let db_pool_data = web::Data::new(db_pool);

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let cors_allowed_origins = config.security.cors_allowed_origins.clone();

    info!("Server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let cors = if cors_allowed_origins.is_empty() {
            Cors::default().allow_any_origin()
        } else {
            cors_allowed_origins.iter().fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        }
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(app_state.clone())
            .app_data(db_pool_data.clone())
            .configure(routes::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
