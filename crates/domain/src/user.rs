//! User account domain types and validation rules.
//!
//! Password strength rules follow the OWASP Password Storage cheat sheet;
//! email validation is structural only, deliverability is the notification
//! service's problem.

use chrono::{DateTime, Utc};
use scolaris_core::{AppError, AppResult, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one
    /// `@`, local part and domain are non-empty, domain contains at least one
    /// `.`. The canonical form is trimmed and lowercased.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum password length (NIST SP800-63B).
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum password length to allow passphrases while bounding Argon2id cost.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password against OWASP and NIST rules.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    if is_common_password(password) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|entry| *entry == lowered)
}

/// Top breached passwords (subset for fast embedded check).
static COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "trustno1",
    "sunshine",
    "superman",
    "welcome1",
    "letmein123",
    "dragon123",
    "football1",
    "baseball1",
    "starwars1",
    "ateacher123",
    "astudent123",
];

/// A single-use token digest with expiry, held by a user for email
/// confirmation or password reset.
///
/// Only the SHA-256 digest of the raw token is stored; the raw value travels
/// in the outbound notification event and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeToken {
    /// Hex-encoded SHA-256 digest of the raw token.
    pub digest: String,
    /// Instant after which the token is no longer redeemable.
    pub expires_at: DateTime<Utc>,
}

impl OneTimeToken {
    /// Creates a token record from a digest and expiry.
    #[must_use]
    pub fn new(digest: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            digest: digest.into(),
            expires_at,
        }
    }

    /// Returns whether the token is still redeemable at `now`.
    #[must_use]
    pub fn is_valid(&self, digest: &str, now: DateTime<Utc>) -> bool {
        self.digest == digest && now <= self.expires_at
    }
}

/// A user account aggregate.
///
/// Owns credential material and activation state. Profile ownership
/// (teacher/student/parent) lives in the relationship graph, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Canonical email address, unique platform-wide.
    pub email: EmailAddress,
    /// Human-readable display name.
    pub display_name: String,
    /// Argon2id password hash.
    pub password_hash: String,
    /// Whether the account may authenticate.
    pub is_active: bool,
    /// Whether the email address has been confirmed.
    pub email_confirmed: bool,
    /// Outstanding email-confirmation token, if any.
    pub confirmation_token: Option<OneTimeToken>,
    /// Outstanding password-reset token, if any.
    pub password_reset_token: Option<OneTimeToken>,
    /// Instant of the most recent successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl User {
    /// Creates a new, unconfirmed user account.
    pub fn register(
        email: EmailAddress,
        display_name: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(AppError::Validation(
                "display name must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id: UserId::new(),
            email,
            display_name,
            password_hash: password_hash.into(),
            is_active: true,
            email_confirmed: false,
            confirmation_token: None,
            password_reset_token: None,
            last_login_at: None,
            created_at: now,
            version: Version::initial(),
        })
    }

    /// Stores a fresh email-confirmation token digest.
    pub fn issue_confirmation_token(&mut self, token: OneTimeToken) {
        self.confirmation_token = Some(token);
    }

    /// Confirms the email address against a presented token digest.
    pub fn confirm_email(&mut self, digest: &str, now: DateTime<Utc>) -> AppResult<()> {
        let Some(token) = self.confirmation_token.as_ref() else {
            return Err(AppError::InvalidStateTransition(
                "no confirmation is pending for this account".to_owned(),
            ));
        };

        if !token.is_valid(digest, now) {
            return Err(AppError::InvalidStateTransition(
                "confirmation token is invalid or expired".to_owned(),
            ));
        }

        self.email_confirmed = true;
        self.confirmation_token = None;
        Ok(())
    }

    /// Stores a fresh password-reset token digest.
    pub fn issue_password_reset_token(&mut self, token: OneTimeToken) {
        self.password_reset_token = Some(token);
    }

    /// Replaces the password hash against a presented reset token digest.
    pub fn reset_password(
        &mut self,
        digest: &str,
        new_password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let Some(token) = self.password_reset_token.as_ref() else {
            return Err(AppError::InvalidStateTransition(
                "no password reset is pending for this account".to_owned(),
            ));
        };

        if !token.is_valid(digest, now) {
            return Err(AppError::InvalidStateTransition(
                "password reset token is invalid or expired".to_owned(),
            ));
        }

        self.password_hash = new_password_hash.into();
        self.password_reset_token = None;
        Ok(())
    }

    /// Records a successful login.
    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
    }

    /// Deactivates the account, blocking further authentication.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Reactivates a previously deactivated account.
    pub fn activate(&mut self) {
        self.is_active = true;
    }
}
