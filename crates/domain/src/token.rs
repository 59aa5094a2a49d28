//! Refresh token lifecycle.
//!
//! A refresh token is its own aggregate root: it is inserted and revoked
//! directly against the refresh-token store, never through the owning user
//! aggregate, so token writes cannot trip the user's optimistic-concurrency
//! check. Activity is always derived, never stored.

use chrono::{DateTime, Utc};
use scolaris_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// Default refresh token validity window in days.
pub const REFRESH_TOKEN_DEFAULT_DAYS: i64 = 7;

/// Unique identifier for a refresh token row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefreshTokenId(Uuid);

impl RefreshTokenId {
    /// Creates a new random token identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a token identifier from an existing UUID value.
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

impl Default for RefreshTokenId {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored refresh token.
///
/// Only the SHA-256 digest of the opaque value is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Unique identifier.
    pub id: RefreshTokenId,
    /// Owning user.
    pub user_id: UserId,
    /// Hex-encoded SHA-256 digest of the opaque token value.
    pub token_digest: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Instant after which the token can no longer be redeemed.
    pub expires_at: DateTime<Utc>,
    /// IP address the token was issued to.
    pub created_by_ip: Option<String>,
    /// Instant of revocation, if revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// IP address that requested the revocation.
    pub revoked_by_ip: Option<String>,
    /// Reason recorded at revocation, e.g. "rotated" or "logout".
    pub revoked_reason: Option<String>,
}

impl RefreshToken {
    /// Creates a new active token record.
    pub fn issue(
        user_id: UserId,
        token_digest: impl Into<String>,
        created_by_ip: Option<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        if expires_at <= now {
            return Err(AppError::Validation(
                "refresh token expiry must be in the future".to_owned(),
            ));
        }

        Ok(Self {
            id: RefreshTokenId::new(),
            user_id,
            token_digest: token_digest.into(),
            created_at: now,
            expires_at,
            created_by_ip,
            revoked_at: None,
            revoked_by_ip: None,
            revoked_reason: None,
        })
    }

    /// Returns whether the token has passed its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns whether the token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Derived activity: neither revoked nor expired.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }

    /// Revokes the token.
    ///
    /// Idempotent: revoking an already-revoked token succeeds without
    /// changing the original revocation record.
    pub fn revoke(&mut self, now: DateTime<Utc>, ip: Option<String>, reason: impl Into<String>) {
        if self.is_revoked() {
            return;
        }

        self.revoked_at = Some(now);
        self.revoked_by_ip = ip;
        self.revoked_reason = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn sample_token() -> RefreshToken {
        let now = Utc::now();
        RefreshToken::issue(
            UserId::new(),
            "digest",
            Some("10.0.0.1".to_owned()),
            now + Duration::days(REFRESH_TOKEN_DEFAULT_DAYS),
            now,
        )
        .unwrap_or_else(|_| panic!("test token"))
    }

    #[test]
    fn activity_is_derived_from_revocation_and_expiry() {
        let token = sample_token();
        let now = Utc::now();

        assert!(token.is_active(now));
        assert!(!token.is_active(now + Duration::days(8)));

        let mut revoked = token.clone();
        revoked.revoke(now, None, "logout");
        assert!(!revoked.is_active(now));
    }

    #[test]
    fn double_revoke_keeps_original_record() {
        let mut token = sample_token();
        let first = Utc::now();
        token.revoke(first, Some("10.0.0.1".to_owned()), "logout");

        token.revoke(first + Duration::hours(1), Some("10.0.0.2".to_owned()), "rotated");

        assert_eq!(token.revoked_at, Some(first));
        assert_eq!(token.revoked_by_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(token.revoked_reason.as_deref(), Some("logout"));
    }

    #[test]
    fn issue_rejects_past_expiry() {
        let now = Utc::now();
        let result = RefreshToken::issue(UserId::new(), "digest", None, now - Duration::hours(1), now);
        assert!(result.is_err());
    }
}
