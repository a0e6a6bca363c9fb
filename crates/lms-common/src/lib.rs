//! LMS Common Library
//!
//! Shared utilities and error handling for the LMS workspace.
//!
//! - **Error Handling**: the workspace-wide [`LmsError`] and [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Money**: conversions between decimal prices and gateway minor units
//!
//! # Example
//!
//! ```no_run
//! use lms_common::money::to_minor_units;
//! use lms_common::Result;
//!
//! fn charge(price: &bigdecimal::BigDecimal) -> Result<i64> {
//!     to_minor_units(price)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod money;

// Re-export commonly used types
pub use error::{LmsError, Result};
