//! # Repository Layer
//!
//! The repository layer provides data access abstractions for the identity
//! domain. It encapsulates all database operations, hiding SQL complexity
//! from the service layer.
//!
//! ## Clean Architecture Principles
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Service Layer                                  │
//! │                    (Business logic, validation)                         │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Repository Layer                                 │
//! │  UserRepository │ SessionRepository │ OAuthRepository                  │
//! │  ProfileRepository │ EmailVerificationRepository │ PasswordResetRepository│
//! └───────────────────────────────────┬─────────────────────────────────────┘
//!                                     │ sqlx queries
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PostgreSQL Database                             │
//! │  users │ sessions │ oauth_accounts │ user_profiles │                    │
//! │  email_verifications │ password_resets                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Concrete implementations**: each repository is a plain struct over a
//!    `PgPool` rather than a trait - traits live at the engine boundary in
//!    the service layer where mock substitution actually matters for tests.
//!
//! 2. **Connection pool**: every repository holds a `PgPool` clone (Arc
//!    internally) for efficient connection sharing.
//!
//! 3. **Error handling**: database errors are mapped to
//!    [`shared::errors::ApiError`] for consistent HTTP responses.
//!
//! 4. **Hard deletes**: there is no soft-delete column anywhere in this
//!    schema - deleting a user cascades to every child table.

pub mod email_verification_repository;
pub mod oauth_repository;
pub mod password_reset_repository;
pub mod profile_repository;
pub mod session_repository;
pub mod user_repository;

pub use email_verification_repository::EmailVerificationRepository;
pub use oauth_repository::OAuthRepository;
pub use password_reset_repository::PasswordResetRepository;
pub use profile_repository::ProfileRepository;
pub use session_repository::SessionRepository;
pub use user_repository::UserRepository;
