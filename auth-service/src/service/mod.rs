//! # Service Layer
//!
//! The service layer is split into four focused engines rather than one
//! monolithic service, each owning a distinct state machine:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            API Layer                                    │
//! │                    (HTTP handlers, DTOs)                                │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Service Layer                                  │
//! │  ┌───────────────────┐ ┌───────────────┐ ┌─────────────┐ ┌───────────┐  │
//! │  │ CredentialEngine  │ │ SessionEngine │ │ OAuthEngine │ │ CsrfEngine│  │
//! │  │ register, login,  │ │ issue/rotate/ │ │ authz url, │ │ issue/    │  │
//! │  │ password reset,   │ │ revoke session│ │ callback,  │ │ validate  │  │
//! │  │ email verify      │ │ + token family│ │ link state │ │ tokens    │  │
//! │  └───────────────────┘ └───────────────┘ └─────────────┘ └───────────┘  │
//! │  UserCache (read-through Redis cache), sweeper (background expiry)      │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Repository Layer          │    External Services          │
//! │            (Data persistence)          │  (JWT, Redis, mailer, events) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Engine Responsibilities
//!
//! | Engine              | Validation                     | Side Effects                   |
//! |----------------------|--------------------------------|---------------------------------|
//! | `CredentialEngine`   | Email uniqueness, password     | Create user, send email, lockout|
//! | `SessionEngine`      | Refresh token validity/reuse   | Rotate/revoke session + family  |
//! | `OAuthEngine`        | CSRF state nonce               | Link/create account, session    |
//! | `CsrfEngine`         | Token existence                | Issue/consume CSRF token        |
//!
//! ## Related Documentation
//!
//! - JWT handling: [`shared::auth::jwt`]
//! - Password hashing: [`shared::auth::password`]
//! - Repository: [`crate::repository`]

pub mod credential_service;
pub mod csrf_service;
pub mod mailer;
pub mod oauth_service;
pub mod session_service;
pub mod sweeper;
pub mod user_cache;

pub use credential_service::CredentialEngine;
pub use csrf_service::CsrfEngine;
pub use oauth_service::OAuthEngine;
pub use session_service::SessionEngine;
pub use user_cache::UserCache;
