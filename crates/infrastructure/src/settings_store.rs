//! Platform settings storage with a Redis read-through cache.
//!
//! The cache is not write-through: an update writes PostgreSQL and deletes
//! the cached entry, and the next read repopulates it. Cache failures fall
//! back to the source store so a Redis outage degrades to slower reads.

use async_trait::async_trait;
use redis::AsyncCommands;
use sqlx::{FromRow, PgPool};

use scolaris_application::SettingsStore;
use scolaris_core::AppResult;

use crate::pg_errors::map_query_error;

/// Cache entry lifetime in seconds.
const CACHE_TTL_SECONDS: u64 = 300;

/// PostgreSQL-backed settings store.
#[derive(Clone)]
pub struct PostgresSettingsStore {
    pool: PgPool,
}

impl PostgresSettingsStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SettingRow {
    value: String,
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT value FROM platform_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to load setting"))?;

        Ok(row.map(|row| row.value))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO platform_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to store setting"))?;

        Ok(())
    }
}

/// Redis read-through cache in front of the PostgreSQL settings store.
#[derive(Clone)]
pub struct RedisCachedSettingsStore {
    client: redis::Client,
    key_prefix: String,
    inner: PostgresSettingsStore,
}

impl RedisCachedSettingsStore {
    /// Creates a cached store with a configured Redis client and prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>, inner: PostgresSettingsStore) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            inner,
        }
    }

    fn cache_key(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }

    async fn cached_value(&self, key: &str) -> Option<String> {
        let mut connection = self.client.get_multiplexed_async_connection().await.ok()?;
        connection.get::<_, Option<String>>(self.cache_key(key)).await.ok()?
    }

    async fn repopulate(&self, key: &str, value: &str) {
        let Ok(mut connection) = self.client.get_multiplexed_async_connection().await else {
            return;
        };
        let outcome: Result<(), redis::RedisError> = connection
            .set_ex(self.cache_key(key), value, CACHE_TTL_SECONDS)
            .await;
        if let Err(error) = outcome {
            tracing::warn!(key, %error, "failed to repopulate settings cache");
        }
    }

    async fn invalidate(&self, key: &str) {
        let Ok(mut connection) = self.client.get_multiplexed_async_connection().await else {
            return;
        };
        let outcome: Result<(), redis::RedisError> = connection.del(self.cache_key(key)).await;
        if let Err(error) = outcome {
            tracing::warn!(key, %error, "failed to invalidate settings cache");
        }
    }
}

#[async_trait]
impl SettingsStore for RedisCachedSettingsStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        if let Some(cached) = self.cached_value(key).await {
            return Ok(Some(cached));
        }

        let value = self.inner.get(key).await?;
        if let Some(ref value) = value {
            self.repopulate(key, value).await;
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set(key, value).await?;
        self.invalidate(key).await;
        Ok(())
    }
}
