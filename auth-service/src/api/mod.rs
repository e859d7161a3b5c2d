//! # API Layer
//!
//! The API layer handles HTTP request/response processing for authentication
//! endpoints. It bridges the HTTP world with the service layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            HTTP Request                                 │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Routes (routes.rs)                             │
//! │  Define URL patterns and HTTP methods, map to handlers                  │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Handlers (handlers.rs)                           │
//! │  1. Extract request data (JSON body, headers, path params)              │
//! │  2. Validate input using DTOs                                           │
//! │  3. Call service layer                                                  │
//! │  4. Transform response                                                  │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          DTOs (dto.rs)                                  │
//! │  - Request validation (serde, validator)                                │
//! │  - Response serialization                                               │
//! │  - API contract definitions                                             │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! | Module       | Responsibility                                      |
//! |--------------|-----------------------------------------------------|
//! | `routes`     | Route definitions with actix-web's `configure()`    |
//! | `handlers`   | Request handlers (extractors → service → response)  |
//! | `dto`        | Data Transfer Objects for request/response          |
//!
//! ## Endpoint Summary
//!
//! | Method | Path                                | Handler                  | Auth   |
//! |--------|-------------------------------------|--------------------------|--------|
//! | GET    | `/api/v1/auth/csrf-token`           | `issue_csrf_token`       | No     |
//! | POST   | `/api/v1/auth/register`             | `register`               | No     |
//! | POST   | `/api/v1/auth/login`                | `login`                  | No     |
//! | POST   | `/api/v1/auth/refresh`              | `refresh_token`          | No     |
//! | POST   | `/api/v1/auth/logout`               | `logout`                 | No     |
//! | POST   | `/api/v1/auth/verify-email`         | `verify_email`           | No     |
//! | POST   | `/api/v1/auth/forgot-password`      | `forgot_password`        | No     |
//! | POST   | `/api/v1/auth/reset-password`       | `reset_password`         | No     |
//! | POST   | `/api/v1/auth/change-password`      | `change_password`        | Bearer |
//! | GET    | `/api/v1/auth/me`                   | `get_profile`            | Bearer |
//! | GET    | `/api/v1/auth/oauth/{provider}`     | `oauth_authorize`        | No     |
//! | GET    | `/api/v1/auth/oauth/{provider}/callback` | `oauth_callback`    | No     |
//! | GET    | `/api/v1/auth/oauth/linked`         | `oauth_linked`           | Bearer |
//! | DELETE | `/api/v1/auth/oauth/{provider}`     | `oauth_unlink`           | Bearer |
//! | GET    | `/api/v1/sessions`                  | `list_sessions`          | Bearer |
//! | DELETE | `/api/v1/sessions/other`            | `revoke_other_sessions`  | Bearer |
//! | DELETE | `/api/v1/sessions/{id}`             | `revoke_session`         | Bearer |
//! | GET    | `/health`                           | `health_check`           | No     |
//!
//! ## Related Documentation
//!
//! - Service layer: [`crate::service`]
//! - Error responses: [`shared::errors::ApiError`]

pub mod dto;
pub mod handlers;
pub mod routes;
