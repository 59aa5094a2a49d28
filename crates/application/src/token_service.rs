//! Access and refresh token lifecycle.
//!
//! Access tokens are a signed snapshot of the user's authorization at mint
//! time: one role claim per non-deleted role and the deduplicated union of
//! those roles' permission keys, reproducing the resolver's algorithm.
//! Refresh tokens are opaque values written directly to their own store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use scolaris_core::{AppError, AppResult};
use scolaris_domain::{REFRESH_TOKEN_DEFAULT_DAYS, RefreshToken, User, UserId};

use crate::ports::identity::UserRepository;
use crate::ports::rbac::RoleRepository;
use crate::ports::tokens::{
    AccessTokenClaims, AccessTokenSigner, RefreshTokenRepository, SettingsStore,
};
use crate::token_crypto;

#[cfg(test)]
mod tests;

/// Access token lifetime used when neither the environment nor the settings
/// store yields a parseable value.
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// Settings key for the access token lifetime in minutes.
pub const ACCESS_TOKEN_MINUTES_KEY: &str = "auth.access_token_minutes";

/// Settings key for the refresh token lifetime in days.
pub const REFRESH_TOKEN_DAYS_KEY: &str = "auth.refresh_token_days";

/// Environment overrides captured at startup by the composition root.
#[derive(Debug, Clone, Default)]
pub struct TokenServiceConfig {
    /// Raw `ACCESS_TOKEN_MINUTES` environment value, if set.
    pub access_token_minutes_override: Option<String>,
    /// Raw `REFRESH_TOKEN_DAYS` environment value, if set.
    pub refresh_token_days_override: Option<String>,
}

/// A freshly minted access/refresh token pair.
#[derive(Debug, Clone)]
pub struct IssuedTokenPair {
    /// Signed access token.
    pub access_token: String,
    /// Opaque refresh token value (raw; only its digest is stored).
    pub refresh_token: String,
    /// Expiry of the refresh token.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Application service for session and refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    users: Arc<dyn UserRepository>,
    role_repository: Arc<dyn RoleRepository>,
    signer: Arc<dyn AccessTokenSigner>,
    settings: Arc<dyn SettingsStore>,
    config: TokenServiceConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        users: Arc<dyn UserRepository>,
        role_repository: Arc<dyn RoleRepository>,
        signer: Arc<dyn AccessTokenSigner>,
        settings: Arc<dyn SettingsStore>,
        config: TokenServiceConfig,
    ) -> Self {
        Self {
            refresh_tokens,
            users,
            role_repository,
            signer,
            settings,
            config,
        }
    }

    /// Builds and signs an access token for a user.
    ///
    /// Claims: subject id, email, a fresh token id, one role claim per
    /// non-deleted role, and the deduplicated union of permission claims
    /// from those roles' bindings.
    pub async fn generate_access_token(&self, user: &User) -> AppResult<String> {
        let bound_roles = self.role_repository.list_for_user(user.id).await?;

        let mut role_claims = Vec::new();
        let mut permission_claims = BTreeSet::new();
        for role in bound_roles.iter().filter(|role| !role.is_deleted) {
            role_claims.push(role.name.clone());
            let keys = self.role_repository.list_permission_keys(role.id).await?;
            permission_claims.extend(keys.into_iter().map(String::from));
        }

        let now = Utc::now();
        let claims = AccessTokenClaims {
            subject: user.id,
            email: user.email.as_str().to_owned(),
            token_id: Uuid::new_v4(),
            roles: role_claims,
            permissions: permission_claims.into_iter().collect(),
            issued_at: now,
            expires_at: now + Duration::minutes(self.access_token_minutes().await),
        };

        self.signer.sign(&claims)
    }

    /// Creates and stores a refresh token for a user. Returns the raw
    /// opaque value and the stored record.
    ///
    /// The insert goes directly against the refresh-token store; the owning
    /// user row and its version counter stay untouched.
    pub async fn generate_refresh_token(
        &self,
        user_id: UserId,
        ip: Option<String>,
    ) -> AppResult<(String, RefreshToken)> {
        let (raw_token, digest) = token_crypto::generate_token()?;
        let now = Utc::now();
        let token = RefreshToken::issue(
            user_id,
            digest,
            ip,
            now + Duration::days(self.refresh_token_days().await),
            now,
        )?;

        self.refresh_tokens.insert(&token).await?;
        Ok((raw_token, token))
    }

    /// Mints an access/refresh pair for an authenticated user.
    pub async fn issue_token_pair(
        &self,
        user: &User,
        ip: Option<String>,
    ) -> AppResult<IssuedTokenPair> {
        let access_token = self.generate_access_token(user).await?;
        let (refresh_token, record) = self.generate_refresh_token(user.id, ip).await?;

        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            refresh_expires_at: record.expires_at,
        })
    }

    /// Rotates a refresh token: revokes the presented one and issues a
    /// fresh pair for the same user.
    pub async fn refresh(&self, raw_token: &str, ip: Option<String>) -> AppResult<IssuedTokenPair> {
        let mut token = self.require_token(raw_token).await?;

        let now = Utc::now();
        if !token.is_active(now) {
            return Err(AppError::Unauthorized(
                "refresh token is no longer active".to_owned(),
            ));
        }

        let user = self
            .users
            .find_by_id(token.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", token.user_id)))?;
        if !user.is_active {
            return Err(AppError::Unauthorized("account is deactivated".to_owned()));
        }

        token.revoke(now, ip.clone(), "rotated");
        self.refresh_tokens.store_revocation(&token).await?;

        self.issue_token_pair(&user, ip).await
    }

    /// Revokes a refresh token.
    ///
    /// Idempotent: revoking an already-revoked token succeeds without
    /// changing the original revocation record.
    pub async fn revoke(
        &self,
        raw_token: &str,
        ip: Option<String>,
        reason: &str,
    ) -> AppResult<()> {
        let mut token = self.require_token(raw_token).await?;

        token.revoke(Utc::now(), ip, reason);
        self.refresh_tokens.store_revocation(&token).await
    }

    async fn require_token(&self, raw_token: &str) -> AppResult<RefreshToken> {
        let digest = token_crypto::hash_token(raw_token);
        self.refresh_tokens
            .find_by_digest(&digest)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown refresh token".to_owned()))
    }

    /// Resolves the access token lifetime: environment override, then the
    /// settings store, then the 30-minute default. Parse failures fall
    /// through silently; this resolution never errors.
    async fn access_token_minutes(&self) -> i64 {
        if let Some(minutes) =
            parse_positive(self.config.access_token_minutes_override.as_deref())
        {
            return minutes;
        }

        if let Ok(stored) = self.settings.get(ACCESS_TOKEN_MINUTES_KEY).await
            && let Some(minutes) = parse_positive(stored.as_deref())
        {
            return minutes;
        }

        DEFAULT_ACCESS_TOKEN_MINUTES
    }

    /// Resolves the refresh token lifetime with the same fallback chain
    /// and a 7-day default.
    async fn refresh_token_days(&self) -> i64 {
        if let Some(days) = parse_positive(self.config.refresh_token_days_override.as_deref()) {
            return days;
        }

        if let Ok(stored) = self.settings.get(REFRESH_TOKEN_DAYS_KEY).await
            && let Some(days) = parse_positive(stored.as_deref())
        {
            return days;
        }

        REFRESH_TOKEN_DEFAULT_DAYS
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
}
