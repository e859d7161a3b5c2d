//! # Route Configuration
//!
//! Defines URL patterns and maps them to handler functions.
//!
//! ## Route Structure
//!
//! ```text
//! /
//! ├── health                              GET    → health_check
//! │
//! └── api/v1/
//!     ├── auth/
//!     │   ├── csrf-token                  GET    → issue_csrf_token
//!     │   ├── register                    POST   → register
//!     │   ├── login                       POST   → login
//!     │   ├── refresh                     POST   → refresh_token
//!     │   ├── logout                      POST   → logout
//!     │   ├── verify-email                POST   → verify_email
//!     │   ├── forgot-password             POST   → forgot_password
//!     │   ├── reset-password              POST   → reset_password
//!     │   ├── change-password             POST   → change_password
//!     │   ├── me                          GET    → get_profile
//!     │   └── oauth/
//!     │       ├── linked                  GET    → oauth_linked
//!     │       └── {provider}/
//!     │           ├── (authorize)         GET    → oauth_authorize
//!     │           ├── callback            GET    → oauth_callback
//!     │           └── (unlink)            DELETE → oauth_unlink
//!     └── sessions/
//!         ├── (list)                      GET    → list_sessions
//!         ├── other                       DELETE → revoke_other_sessions
//!         └── {id}                       DELETE → revoke_session
//! ```
//!
//! ## Versioning
//!
//! All endpoints are versioned under `/api/v1/`.
//!
//! ## Authentication
//!
//! Protected handlers extract and validate the bearer token themselves -
//! see [`super::handlers::authenticate`]. There is no wrapping auth
//! middleware in this route table.
//!
//! ## CSRF
//!
//! Every state-changing endpoint (anything other than a `GET`, plus the
//! OAuth callback which is CSRF-exempt because the `state` nonce already
//! covers it) validates the `X-CSRF-Token` header via
//! [`super::handlers::csrf_guard`].
//!
//! ## Related Documentation
//!
//! - Handler implementations: [`super::handlers`]

use actix_web::web;

use super::handlers;

/// Configures all routes for the auth service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check)).service(
        web::scope("/api/v1")
            .service(
                web::scope("/auth")
                    .route("/csrf-token", web::get().to(handlers::issue_csrf_token))
                    .route("/register", web::post().to(handlers::register))
                    .route("/login", web::post().to(handlers::login))
                    .route("/refresh", web::post().to(handlers::refresh_token))
                    .route("/logout", web::post().to(handlers::logout))
                    .route("/verify-email", web::post().to(handlers::verify_email))
                    .route("/forgot-password", web::post().to(handlers::forgot_password))
                    .route("/reset-password", web::post().to(handlers::reset_password))
                    .route("/change-password", web::post().to(handlers::change_password))
                    .route("/me", web::get().to(handlers::get_profile))
                    .route("/oauth/linked", web::get().to(handlers::oauth_linked))
                    .route("/oauth/{provider}/callback", web::get().to(handlers::oauth_callback))
                    .route("/oauth/{provider}", web::get().to(handlers::oauth_authorize))
                    .route("/oauth/{provider}", web::delete().to(handlers::oauth_unlink)),
            )
            .service(
                web::scope("/sessions")
                    .route("", web::get().to(handlers::list_sessions))
                    .route("/other", web::delete().to(handlers::revoke_other_sessions))
                    .route("/{id}", web::delete().to(handlers::revoke_session)),
            ),
    );
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_unknown_route_returns_404() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/v1/auth/does-not-exist").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_health_route_is_registered() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }
}
