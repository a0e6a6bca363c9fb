//! Shared utilities and types for feature modules
//!
//! - **auth**: caller extraction and role guards
//! - **lookup**: course, lesson and quiz lookups
//! - **pagination**: common pagination types
//! - **validation**: input validation utilities
//! - **error_helpers**: constraint checks and standard error responses
//! - **test_helpers**: database fixtures (test-only)

pub mod auth;
pub mod error_helpers;
pub mod lookup;
pub mod pagination;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use auth::{require_account, AuthError, Caller};
pub use pagination::{Paginated, PaginationMetadata, PaginationParams};
