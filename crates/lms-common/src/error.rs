//! Error types shared across the LMS workspace

use thiserror::Error;

/// Result type alias for shared LMS helpers
pub type Result<T> = std::result::Result<T, LmsError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LmsError {
    /// A price or charge that cannot be stored or sent to the gateway
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
