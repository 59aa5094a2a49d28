use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scolaris_core::AppResult;
use scolaris_domain::{RefreshToken, UserId};
use uuid::Uuid;

/// Repository port for refresh tokens.
///
/// Deliberately writes directly to the refresh-token table: tokens are their
/// own aggregate, so issuing or revoking one never touches the owning user
/// row or its version counter.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persists a new token row.
    async fn insert(&self, token: &RefreshToken) -> AppResult<()>;

    /// Finds a token by the digest of its opaque value.
    async fn find_by_digest(&self, digest: &str) -> AppResult<Option<RefreshToken>>;

    /// Stores the revocation fields of a token. Writes only when the stored
    /// row is not yet revoked, keeping revocation idempotent under races.
    async fn store_revocation(&self, token: &RefreshToken) -> AppResult<()>;
}

/// Claims carried by a signed access token.
///
/// Role and permission claims are a snapshot of current bindings at mint
/// time, produced by the same resolution as the authorization resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenClaims {
    /// Subject user.
    pub subject: UserId,
    /// Canonical email.
    pub email: String,
    /// Fresh unique token identifier.
    pub token_id: Uuid,
    /// One claim per non-deleted role bound to the user.
    pub roles: Vec<String>,
    /// Deduplicated union of permission keys from those roles.
    pub permissions: Vec<String>,
    /// Issue instant.
    pub issued_at: DateTime<Utc>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

/// Port for signing and verifying access tokens.
pub trait AccessTokenSigner: Send + Sync {
    /// Signs a claim set into a compact token.
    fn sign(&self, claims: &AccessTokenClaims) -> AppResult<String>;

    /// Verifies a compact token and returns its claims.
    fn verify(&self, token: &str) -> AppResult<AccessTokenClaims>;
}

/// Port for platform settings reads and writes.
///
/// Reads may be served from a distributed cache; an update invalidates the
/// cache entry rather than writing through, so a narrow staleness window is
/// acceptable.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the raw setting value, if present.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores a setting value and invalidates any cached copy.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;
}
