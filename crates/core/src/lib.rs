//! Shared primitives for all Rust crates in Scolaris.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::UserIdentity;

/// Result type used across Scolaris crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Optimistic-concurrency token carried by aggregate roots.
///
/// The version is read together with the aggregate and passed back explicitly
/// on every update, where the repository compares it against the stored value
/// and rejects stale writes with [`AppError::ConcurrencyConflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(i64);

impl Version {
    /// Version assigned to a freshly created aggregate.
    #[must_use]
    pub fn initial() -> Self {
        Self(1)
    }

    /// Wraps a stored version counter.
    pub fn from_stored(value: i64) -> AppResult<Self> {
        if value < 1 {
            return Err(AppError::Internal(format!(
                "stored version counter must be positive, got {value}"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the version following this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation is not valid for the entity's current lifecycle state.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Rename or delete attempted on a protected built-in role or permission.
    #[error("system entity protected: {0}")]
    SystemEntityProtected(String),

    /// Write carried a stale optimistic-concurrency version.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// User is not authenticated or not allowed to access a resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable machine-readable code for this error category.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidStateTransition(_) => "invalid_state_transition",
            Self::SystemEntityProtected(_) => "system_entity_protected",
            Self::ConcurrencyConflict(_) => "concurrency_conflict",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString, Version};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn version_increments() {
        let version = Version::initial();
        assert_eq!(version.next().as_i64(), 2);
    }

    #[test]
    fn stored_version_must_be_positive() {
        assert!(Version::from_stored(0).is_err());
        assert!(Version::from_stored(3).is_ok());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            AppError::SystemEntityProtected("role".to_owned()).code(),
            "system_entity_protected"
        );
        assert_eq!(
            AppError::ConcurrencyConflict("stale".to_owned()).code(),
            "concurrency_conflict"
        );
    }
}
