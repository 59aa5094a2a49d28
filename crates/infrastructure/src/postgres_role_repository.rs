use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use scolaris_application::RoleRepository;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{Permission, PermissionKey, Role, RoleId, UserId};

use crate::pg_errors::{map_insert_error, map_query_error, stale_write};

/// PostgreSQL-backed repository for roles and their bindings.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: String,
    is_system: bool,
    is_deleted: bool,
    version: i64,
}

impl RoleRow {
    fn into_domain(self) -> AppResult<Role> {
        Ok(Role {
            id: RoleId::from_uuid(self.id),
            name: self.name,
            description: self.description,
            is_system: self.is_system,
            is_deleted: self.is_deleted,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct PermissionKeyRow {
    permission_key: String,
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn insert(&self, role: &Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, is_system, is_deleted, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_system)
        .bind(role.is_deleted)
        .bind(role.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_insert_error(error, &format!("role '{}' already exists", role.name))
        })?;

        Ok(())
    }

    async fn update(&self, role: &Role, expected_version: Version) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE roles SET name = $1, description = $2, is_deleted = $3, version = $4
            WHERE id = $5 AND version = $6
            "#,
        )
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_deleted)
        .bind(new_version.as_i64())
        .bind(role.id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update role"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("role"));
        }

        Ok(new_version)
    }

    async fn hard_delete(&self, role_id: RoleId) -> AppResult<()> {
        // role_permissions and user_roles rows go with the role via
        // ON DELETE CASCADE.
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to delete role"))?;

        Ok(())
    }

    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load role"))?;

        row.map(RoleRow::into_domain).transpose()
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load role by name"))?;

        row.map(RoleRow::into_domain).transpose()
    }

    async fn list(&self, include_deleted: bool) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT * FROM roles WHERE is_deleted = false OR $1 ORDER BY name",
        )
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list roles"))?;

        rows.into_iter().map(RoleRow::into_domain).collect()
    }

    async fn add_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_key)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to bind permission"))?;

        Ok(())
    }

    async fn remove_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_key = $2")
            .bind(role_id.as_uuid())
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to unbind permission"))?;

        Ok(())
    }

    async fn list_permission_keys(&self, role_id: RoleId) -> AppResult<Vec<PermissionKey>> {
        let rows = sqlx::query_as::<_, PermissionKeyRow>(
            "SELECT permission_key FROM role_permissions WHERE role_id = $1",
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list role permissions"))?;

        rows.into_iter()
            .map(|row| PermissionKey::new(row.permission_key))
            .collect()
    }

    async fn assign_to_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        // The unique pair makes concurrent assigns collapse to one binding.
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to assign role"))?;

        Ok(())
    }

    async fn remove_from_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to remove role"))?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.*
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1
            ORDER BY roles.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list user roles"))?;

        rows.into_iter().map(RoleRow::into_domain).collect()
    }
}

/// Converts a stored permission row into the domain type; shared with the
/// permission repository.
#[derive(Debug, FromRow)]
pub(crate) struct PermissionRow {
    pub(crate) key: String,
    pub(crate) description: String,
    pub(crate) permission_group: String,
    pub(crate) is_system: bool,
    pub(crate) is_deleted: bool,
    pub(crate) version: i64,
}

impl PermissionRow {
    pub(crate) fn into_domain(self) -> AppResult<Permission> {
        Ok(Permission {
            key: PermissionKey::new(self.key)?,
            description: self.description,
            group: self.permission_group,
            is_system: self.is_system,
            is_deleted: self.is_deleted,
            version: Version::from_stored(self.version)?,
        })
    }
}
