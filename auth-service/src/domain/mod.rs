//! # Domain Layer
//!
//! The domain layer contains the core business entities and security events
//! for the identity service. This layer is **framework-agnostic** and
//! represents the heart of the business logic.
//!
//! ## Clean Architecture Principles
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                         Domain Layer                              │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │                       Entities                              │  │
//! │  │  - User: identity, credential, role                         │  │
//! │  │  - Session: one row per outstanding refresh token           │  │
//! │  │  - OAuthAccount: linked third-party identity                │  │
//! │  │  - UserProfile: optional display/bio extension              │  │
//! │  │  - EmailVerification: email-confirmation token lifecycle    │  │
//! │  │  - PasswordReset: password-reset token lifecycle            │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! │                                                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │                     Security Events                         │  │
//! │  │  - SecurityEvent: flat enum of every audited state change   │  │
//! │  │  - EventEmitter: sink trait engines depend on                │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! | Module     | Purpose                                           |
//! |------------|---------------------------------------------------|
//! | `entities` | Core domain entities mapped to database tables    |
//! | `events`   | Security events emitted by the engine layer       |
//!
//! ## Design Decisions
//!
//! 1. **Entities vs DTOs**: Domain entities contain all database fields,
//!    while separate DTOs in the API layer handle request/response transformation.
//!
//! 2. **`FromRow` Derive**: Entities use sqlx's `FromRow` for automatic
//!    mapping from database rows, reducing boilerplate.
//!
//! 3. **Hard deletes**: Deleting a `User` cascades to every child table via
//!    foreign keys. There is no soft-delete column.

pub mod entities;
pub mod events;

pub use entities::*;
pub use events::{EventEmitter, LoginFailureReason, SecurityEvent, SecurityEventEnvelope, TracingEventEmitter};
