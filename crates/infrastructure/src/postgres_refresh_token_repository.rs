use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use scolaris_application::RefreshTokenRepository;
use scolaris_core::AppResult;
use scolaris_domain::{RefreshToken, RefreshTokenId, UserId};

use crate::pg_errors::{map_insert_error, map_query_error};

/// PostgreSQL-backed repository for refresh tokens.
///
/// Writes go straight to `refresh_tokens`: the table carries no version
/// column and the owning user row is never touched, so token churn cannot
/// produce concurrency conflicts on the user aggregate.
#[derive(Clone)]
pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_digest: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_by_ip: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by_ip: Option<String>,
    revoked_reason: Option<String>,
}

impl RefreshTokenRow {
    fn into_domain(self) -> RefreshToken {
        RefreshToken {
            id: RefreshTokenId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            token_digest: self.token_digest,
            created_at: self.created_at,
            expires_at: self.expires_at,
            created_by_ip: self.created_by_ip,
            revoked_at: self.revoked_at,
            revoked_by_ip: self.revoked_by_ip,
            revoked_reason: self.revoked_reason,
        }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, user_id, token_digest, created_at, expires_at, created_by_ip,
                revoked_at, revoked_by_ip, revoked_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(token.user_id.as_uuid())
        .bind(&token.token_digest)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(&token.created_by_ip)
        .bind(token.revoked_at)
        .bind(&token.revoked_by_ip)
        .bind(&token.revoked_reason)
        .execute(&self.pool)
        .await
        .map_err(|error| map_insert_error(error, "refresh token already exists"))?;

        Ok(())
    }

    async fn find_by_digest(&self, digest: &str) -> AppResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT * FROM refresh_tokens WHERE token_digest = $1",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to load refresh token"))?;

        Ok(row.map(RefreshTokenRow::into_domain))
    }

    async fn store_revocation(&self, token: &RefreshToken) -> AppResult<()> {
        // The revoked_at IS NULL guard keeps a concurrent double revoke
        // from overwriting the original record.
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, revoked_by_ip = $2, revoked_reason = $3
            WHERE id = $4 AND revoked_at IS NULL
            "#,
        )
        .bind(token.revoked_at)
        .bind(&token.revoked_by_ip)
        .bind(&token.revoked_reason)
        .bind(token.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to store revocation"))?;

        Ok(())
    }
}
