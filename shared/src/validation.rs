//! # Request Validation Helpers
//!
//! Utilities for validating incoming request data using the `validator` crate.
//!
//! ## Overview
//!
//! This module provides:
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`validate_request`] | Validate a struct implementing `Validate` |
//! | [`parse_and_validate`] | Parse JSON and validate in one step |
//! | [`validators`] | Custom validation functions |
//!
//! ## How Validation Works
//!
//! We use the [`validator`](https://docs.rs/validator/) crate which provides
//! derive macros for declarative validation:
//!
//! ```rust,ignore
//! use validator::Validate;
//!
//! #[derive(Validate)]
//! struct CreateUser {
//!     #[validate(email)]
//!     email: String,
//!     
//!     #[validate(length(min = 10))]
//!     password: String,
//!     
//!     #[validate(custom(function = "validators::not_blank"))]
//!     name: String,
//! }
//! ```
//!
//! ## Validation Flow
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ JSON Request │────►│ Deserialize   │────►│   Validate   │
//! │              │     │ (serde)       │     │  (validator) │
//! └──────────────┘     └───────────────┘     └──────┬───────┘
//!                                                   │
//!         ┌─────────────────────────────────────────┴───────┐
//!         │                                                 │
//!         ▼                                                 ▼
//! ┌───────────────┐                               ┌─────────────────┐
//! │   Success     │                               │ ValidationError │
//! │ (continue)    │                               │   (400 + details)│
//! └───────────────┘                               └─────────────────┘
//! ```
//!
//! ## Error Response Format
//!
//! When validation fails, the API returns a 400 Bad Request with details:
//!
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Validation error",
//!   "details": {
//!     "email": [
//!       { "code": "email", "message": "Invalid email format" }
//!     ],
//!     "password": [
//!       { "code": "length", "message": "Must be at least 10 characters" }
//!     ]
//!   }
//! }
//! ```
//!
//! ## Custom Validators
//!
//! The [`validators`] module provides common validation functions:
//!
//! | Validator | Purpose |
//! |-----------|---------|
//! | `not_blank` | String is not empty after trimming |
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::validation::{validate_request, validators};
//! use validator::Validate;
//!
//! #[derive(Validate)]
//! struct RegisterRequest {
//!     #[validate(email)]
//!     email: String,
//!
//!     #[validate(custom(function = "validators::not_blank"))]
//!     user_name: String,
//! }
//!
//! async fn handler(body: Json<RegisterRequest>) -> Result<impl Responder, ApiError> {
//!     validate_request(&body)?;
//!     // Validation passed, continue...
//! }
//! ```
//!
//! ## Related Documentation
//!
//! - [`validator` crate](https://docs.rs/validator/)
//! - [`crate::errors::ApiError`] - Error handling

use crate::errors::ApiError;
use serde::de::DeserializeOwned;
use validator::Validate;

// =============================================================================
// Core Validation Functions
// =============================================================================

/// Validates a request DTO that implements `Validate`.
///
/// This is the primary validation function. Use it in handlers to
/// validate incoming data.
///
/// ## Example
///
/// ```rust,ignore
/// async fn create_user(body: Json<CreateUserDto>) -> Result<impl Responder, ApiError> {
///     validate_request(&body)?;  // Returns early if invalid
///     
///     // Continue with validated data
/// }
/// ```
///
/// ## Errors
///
/// Returns `ApiError::ValidationError` with field-level details if validation fails.
pub fn validate_request<T: Validate>(data: &T) -> Result<(), ApiError> {
    data.validate().map_err(ApiError::ValidationError)
}

/// Parses JSON string and validates in a single step.
///
/// Useful when you have raw JSON and need to parse + validate.
///
/// ## Example
///
/// ```rust,ignore
/// let json = r#"{"email": "user@example.com", "password": "secret"}"#;
/// let user: CreateUserDto = parse_and_validate(json)?;
/// ```
///
/// ## Errors
///
/// - `ApiError::BadRequest` if JSON parsing fails
/// - `ApiError::ValidationError` if validation fails
pub fn parse_and_validate<T: DeserializeOwned + Validate>(json: &str) -> Result<T, ApiError> {
    // Parse JSON
    let data: T = serde_json::from_str(json)
        .map_err(|e| ApiError::BadRequest { message: e.to_string() })?;

    // Validate
    validate_request(&data)?;

    Ok(data)
}

// =============================================================================
// Custom Validators
// =============================================================================

/// Custom validation functions for use with `#[validate(custom)]`.
///
/// These functions follow the validator crate's signature:
/// `fn(&T) -> Result<(), ValidationError>`
///
/// ## Usage
///
/// ```rust,ignore
/// use validator::Validate;
/// use shared::validation::validators;
///
/// #[derive(Validate)]
/// struct MyStruct {
///     #[validate(custom(function = "validators::not_blank"))]
///     name: String,
/// }
/// ```
pub mod validators {
    use validator::ValidationError;

    /// Validates that a string is not blank (empty or whitespace-only).
    ///
    /// ## Valid Values
    ///
    /// - `"hello"` ✓
    /// - `"  hello  "` ✓ (has content)
    ///
    /// ## Invalid Values
    ///
    /// - `""` ✗
    /// - `"   "` ✗ (whitespace only)
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("blank"));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::validators::*;

    #[test]
    fn test_not_blank_valid() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("  hello  ").is_ok());
        assert!(not_blank("a").is_ok());
    }

    #[test]
    fn test_not_blank_invalid() {
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("\t\n").is_err());
    }
}

