//! # Input Validation
//!
//! Stateless validators and sanitizers for user and membership fields.
//! Every validator either returns the normalized value or a [`ValidationError`]
//! naming the offending field. Nothing here touches storage.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

#[allow(clippy::expect_used)] // static pattern
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("static regex should not panic")
});
// E.164-like: optional '+', first digit 1-9, 6-14 digits in total
#[allow(clippy::expect_used)] // static pattern
static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{5,13}$").expect("static regex should not panic"));
#[allow(clippy::expect_used)] // static pattern
static TENANT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static regex should not panic"));
#[allow(clippy::expect_used)] // static pattern
static OBJECT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("static regex should not panic"));

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 100;
pub const MIN_TENANT_ID_LEN: usize = 3;
pub const MAX_TENANT_ID_LEN: usize = 128;
pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_QUERY_LEN: usize = 100;
pub const MAX_AVATAR_URL_LEN: usize = 2048;
pub const MAX_ROLE_LEN: usize = 64;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
const MAX_SQL_OFFSET: u64 = i64::MAX as u64;

/// A field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} must be between {min} and {max} characters")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },
    #[error("invalid {field} format")]
    InvalidFormat { field: &'static str },
    #[error("{field} contains invalid characters")]
    InvalidCharacters { field: &'static str },
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::TooShort { field, .. }
            | ValidationError::Length { field, .. }
            | ValidationError::InvalidFormat { field }
            | ValidationError::InvalidCharacters { field } => field,
        }
    }
}

/// Clamped page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Number of rows to skip for this page, capped at the largest offset
    /// a signed 64-bit SQL parameter can carry.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(MAX_SQL_OFFSET)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Validates and trims an email address. No case folding is applied.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required { field: "email" });
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email",
            max: MAX_EMAIL_LEN,
        });
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidFormat { field: "email" });
    }
    Ok(email.to_string())
}

/// Validates a first or last name and returns its sanitized form.
///
/// Letters from any script, whitespace, hyphens and apostrophes are accepted.
pub fn validate_name(name: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    let len = trimmed.chars().count();
    if !(1..=MAX_NAME_LEN).contains(&len) {
        return Err(ValidationError::Length {
            field,
            min: 1,
            max: MAX_NAME_LEN,
        });
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c.is_whitespace() || c == '-' || c == '\'')
    {
        return Err(ValidationError::InvalidCharacters { field });
    }
    Ok(sanitize_name(trimmed))
}

/// Validates an optional phone number. Empty input is accepted as "no phone".
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    if phone.is_empty() {
        return Ok(String::new());
    }
    let phone = phone.trim();
    if !PHONE_REGEX.is_match(phone) {
        return Err(ValidationError::InvalidFormat { field: "phone" });
    }
    Ok(phone.to_string())
}

/// Validates a tenant identifier: 3-128 characters of `[a-zA-Z0-9_-]`.
pub fn validate_tenant_id(tenant_id: &str) -> Result<String, ValidationError> {
    let tenant_id = tenant_id.trim();
    if tenant_id.is_empty() {
        return Err(ValidationError::Required { field: "tenant_id" });
    }
    let len = tenant_id.chars().count();
    if !(MIN_TENANT_ID_LEN..=MAX_TENANT_ID_LEN).contains(&len) {
        return Err(ValidationError::Length {
            field: "tenant_id",
            min: MIN_TENANT_ID_LEN,
            max: MAX_TENANT_ID_LEN,
        });
    }
    if !TENANT_ID_REGEX.is_match(tenant_id) {
        return Err(ValidationError::InvalidCharacters { field: "tenant_id" });
    }
    Ok(tenant_id.to_string())
}

/// Validates a 24-character hex record identifier and returns it lowercased.
pub fn validate_object_id(id: &str) -> Result<String, ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::Required { field: "id" });
    }
    if !OBJECT_ID_REGEX.is_match(id) {
        return Err(ValidationError::InvalidFormat { field: "id" });
    }
    Ok(id.to_ascii_lowercase())
}

/// Clamps pagination input. Never fails.
pub fn validate_pagination(page: i64, page_size: i64) -> Pagination {
    let page = if page < 1 { 1 } else { page as u64 };
    let page_size = if page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        (page_size as u64).min(MAX_PAGE_SIZE)
    };
    Pagination { page, page_size }
}

/// Validates a free-text search query and returns its sanitized form.
pub fn validate_search_query(query: &str) -> Result<String, ValidationError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ValidationError::Required { field: "query" });
    }
    let len = query.chars().count();
    if len < MIN_QUERY_LEN {
        return Err(ValidationError::TooShort {
            field: "query",
            min: MIN_QUERY_LEN,
        });
    }
    if len > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query",
            max: MAX_QUERY_LEN,
        });
    }
    Ok(sanitize_string(query))
}

/// Validates an avatar URL: absolute `http`/`https` with a host.
pub fn validate_avatar_url(avatar_url: &str) -> Result<String, ValidationError> {
    let avatar_url = avatar_url.trim();
    if avatar_url.is_empty() {
        return Err(ValidationError::Required {
            field: "avatar_url",
        });
    }
    if avatar_url.chars().count() > MAX_AVATAR_URL_LEN {
        return Err(ValidationError::TooLong {
            field: "avatar_url",
            max: MAX_AVATAR_URL_LEN,
        });
    }
    let parsed = Url::parse(avatar_url).map_err(|_| ValidationError::InvalidFormat {
        field: "avatar_url",
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationError::InvalidFormat {
            field: "avatar_url",
        });
    }
    Ok(avatar_url.to_string())
}

/// Validates a list of role names, returning the de-duplicated set.
pub fn validate_roles<S: AsRef<str>>(roles: &[S]) -> Result<BTreeSet<String>, ValidationError> {
    if roles.is_empty() {
        return Err(ValidationError::Required { field: "roles" });
    }
    let mut set = BTreeSet::new();
    for role in roles {
        let role = role.as_ref().trim();
        let len = role.chars().count();
        if !(1..=MAX_ROLE_LEN).contains(&len) {
            return Err(ValidationError::Length {
                field: "roles",
                min: 1,
                max: MAX_ROLE_LEN,
            });
        }
        if !role
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidCharacters { field: "roles" });
        }
        set.insert(role.to_string());
    }
    Ok(set)
}

/// Strips control characters, trims, and collapses whitespace runs to a single space.
pub fn sanitize_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            continue;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Sanitizes a display name before persistence.
pub fn sanitize_name(name: &str) -> String {
    sanitize_string(name)
}
