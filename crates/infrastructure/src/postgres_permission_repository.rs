use async_trait::async_trait;
use sqlx::PgPool;

use scolaris_application::PermissionRepository;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{Permission, PermissionKey};

use crate::pg_errors::{map_insert_error, map_query_error, stale_write};
use crate::postgres_role_repository::PermissionRow;

/// PostgreSQL-backed repository for permission entries.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn insert(&self, permission: &Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions (key, description, permission_group, is_system, is_deleted, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(permission.key.as_str())
        .bind(&permission.description)
        .bind(&permission.group)
        .bind(permission.is_system)
        .bind(permission.is_deleted)
        .bind(permission.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_insert_error(
                error,
                &format!("permission '{}' already exists", permission.key),
            )
        })?;

        Ok(())
    }

    async fn update(
        &self,
        permission: &Permission,
        expected_version: Version,
    ) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE permissions
            SET description = $1, permission_group = $2, is_deleted = $3, version = $4
            WHERE key = $5 AND version = $6
            "#,
        )
        .bind(&permission.description)
        .bind(&permission.group)
        .bind(permission.is_deleted)
        .bind(new_version.as_i64())
        .bind(permission.key.as_str())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update permission"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("permission"));
        }

        Ok(new_version)
    }

    async fn hard_delete(&self, key: &PermissionKey) -> AppResult<()> {
        sqlx::query("DELETE FROM permissions WHERE key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to delete permission"))?;

        Ok(())
    }

    async fn find_by_key(&self, key: &PermissionKey) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>("SELECT * FROM permissions WHERE key = $1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load permission"))?;

        row.map(PermissionRow::into_domain).transpose()
    }

    async fn list(&self, include_deleted: bool) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT * FROM permissions WHERE is_deleted = false OR $1 ORDER BY permission_group, key",
        )
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list permissions"))?;

        rows.into_iter().map(PermissionRow::into_domain).collect()
    }
}
