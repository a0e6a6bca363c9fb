//! Field checks shared by the account and catalog commands
//!
//! Lengths are counted in characters, not bytes, so titles in any script get
//! the same budget.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlugValidationError {
    #[error("Slug is required and cannot be empty")]
    Required,

    #[error("Slug must be at most {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Slug may contain only lowercase letters, digits and single hyphens between words")]
    InvalidFormat,
}

/// Titles, display names and other free-text labels
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("Name is required and cannot be empty")]
    Required,

    #[error("Name must be at most {max_length} characters")]
    TooLong { max_length: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("{field_name} must be an absolute http(s) URL")]
    InvalidFormat { field_name: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailValidationError {
    #[error("Email is required")]
    Required,

    #[error("Email address is invalid")]
    InvalidFormat,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsernameValidationError {
    #[error("Username must be between 3 and {max_length} characters")]
    Length { max_length: usize },

    #[error("Username can only contain letters, numbers, '.', '_' and '-'")]
    InvalidFormat,
}

/// Category slugs: `web-development`, `python3`
pub fn validate_slug(slug: &str, max_length: usize) -> Result<(), SlugValidationError> {
    if slug.is_empty() {
        return Err(SlugValidationError::Required);
    }
    if slug.chars().count() > max_length {
        return Err(SlugValidationError::TooLong { max_length });
    }

    let words_ok = slug.split('-').all(|word| {
        !word.is_empty() && word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    });
    if !words_ok {
        return Err(SlugValidationError::InvalidFormat);
    }

    Ok(())
}

pub fn validate_name(name: &str, max_length: usize) -> Result<(), NameValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NameValidationError::Required);
    }
    if name.chars().count() > max_length {
        return Err(NameValidationError::TooLong { max_length });
    }
    Ok(())
}

/// Absent and empty values pass; anything else needs a scheme and a host.
pub fn validate_optional_url(url: Option<&str>, field_name: &str) -> Result<(), UrlValidationError> {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(());
    };

    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .and_then(|rest| rest.split(['/', '?', '#']).next())
        .unwrap_or_default();

    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(UrlValidationError::InvalidFormat {
            field_name: field_name.to_string(),
        });
    }
    Ok(())
}

/// One `@`, a non-empty local part, and a dotted domain
pub fn validate_email(email: &str) -> Result<(), EmailValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(EmailValidationError::Required);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(EmailValidationError::InvalidFormat);
    };

    let domain_ok = !domain.contains('@')
        && domain.find('.').is_some_and(|i| i > 0)
        && !domain.ends_with('.');

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(EmailValidationError::InvalidFormat);
    }
    Ok(())
}

pub fn validate_username(username: &str, max_length: usize) -> Result<(), UsernameValidationError> {
    let length = username.chars().count();
    if length < 3 || length > max_length {
        return Err(UsernameValidationError::Length { max_length });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(UsernameValidationError::InvalidFormat);
    }
    Ok(())
}
