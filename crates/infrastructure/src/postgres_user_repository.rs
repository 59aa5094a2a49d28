use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use scolaris_application::UserRepository;
use scolaris_core::{AppError, AppResult, Version};
use scolaris_domain::{EmailAddress, OneTimeToken, User, UserId};

use crate::pg_errors::{map_insert_error, map_query_error, stale_write};

/// PostgreSQL-backed repository for user accounts.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    is_active: bool,
    email_confirmed: bool,
    confirmation_token_digest: Option<String>,
    confirmation_token_expires_at: Option<DateTime<Utc>>,
    reset_token_digest: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl UserRow {
    fn into_domain(self) -> AppResult<User> {
        let confirmation_token = match (self.confirmation_token_digest, self.confirmation_token_expires_at)
        {
            (Some(digest), Some(expires_at)) => Some(OneTimeToken::new(digest, expires_at)),
            _ => None,
        };
        let password_reset_token = match (self.reset_token_digest, self.reset_token_expires_at) {
            (Some(digest), Some(expires_at)) => Some(OneTimeToken::new(digest, expires_at)),
            _ => None,
        };

        Ok(User {
            id: UserId::from_uuid(self.id),
            email: EmailAddress::new(self.email)
                .map_err(|error| AppError::Internal(format!("stored email is invalid: {error}")))?,
            display_name: self.display_name,
            password_hash: self.password_hash,
            is_active: self.is_active,
            email_confirmed: self.email_confirmed,
            confirmation_token,
            password_reset_token,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, display_name, password_hash, is_active, email_confirmed,
                confirmation_token_digest, confirmation_token_expires_at,
                reset_token_digest, reset_token_expires_at,
                last_login_at, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.email_confirmed)
        .bind(user.confirmation_token.as_ref().map(|token| token.digest.as_str()))
        .bind(user.confirmation_token.as_ref().map(|token| token.expires_at))
        .bind(user.password_reset_token.as_ref().map(|token| token.digest.as_str()))
        .bind(user.password_reset_token.as_ref().map(|token| token.expires_at))
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_insert_error(
                error,
                &format!("email '{}' is already registered", user.email.as_str()),
            )
        })?;

        Ok(())
    }

    async fn update(&self, user: &User, expected_version: Version) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE users SET
                display_name = $1,
                password_hash = $2,
                is_active = $3,
                email_confirmed = $4,
                confirmation_token_digest = $5,
                confirmation_token_expires_at = $6,
                reset_token_digest = $7,
                reset_token_expires_at = $8,
                last_login_at = $9,
                version = $10
            WHERE id = $11 AND version = $12
            "#,
        )
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.email_confirmed)
        .bind(user.confirmation_token.as_ref().map(|token| token.digest.as_str()))
        .bind(user.confirmation_token.as_ref().map(|token| token.expires_at))
        .bind(user.password_reset_token.as_ref().map(|token| token.digest.as_str()))
        .bind(user.password_reset_token.as_ref().map(|token| token.expires_at))
        .bind(user.last_login_at)
        .bind(new_version.as_i64())
        .bind(user.id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update user"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("user"));
        }

        Ok(new_version)
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load user"))?;

        row.map(UserRow::into_domain).transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load user by email"))?;

        row.map(UserRow::into_domain).transpose()
    }
}
