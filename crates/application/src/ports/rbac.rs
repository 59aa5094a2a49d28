use async_trait::async_trait;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{Permission, PermissionKey, Role, RoleId, UserId};

/// Repository port for roles, role-permission bindings and user-role
/// bindings.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Persists a new role. Fails with `Conflict` on a duplicate name.
    async fn insert(&self, role: &Role) -> AppResult<()>;

    /// Persists role mutations under an optimistic-concurrency check.
    async fn update(&self, role: &Role, expected_version: Version) -> AppResult<Version>;

    /// Physically removes a role and its bindings.
    async fn hard_delete(&self, role_id: RoleId) -> AppResult<()>;

    /// Finds a role by its unique identifier.
    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Lists roles; soft-deleted rows are included only on request.
    async fn list(&self, include_deleted: bool) -> AppResult<Vec<Role>>;

    /// Binds a permission key to a role. Idempotent.
    async fn add_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()>;

    /// Removes a permission binding from a role. Idempotent.
    async fn remove_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()>;

    /// Lists the permission keys bound to a role.
    async fn list_permission_keys(&self, role_id: RoleId) -> AppResult<Vec<PermissionKey>>;

    /// Binds a role to a user. Idempotent: concurrent calls leave exactly
    /// one binding.
    async fn assign_to_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()>;

    /// Removes a role binding from a user. Idempotent.
    async fn remove_from_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()>;

    /// Lists every role bound to a user, soft-deleted ones included; the
    /// caller decides what resolution filters out.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;
}

/// Repository port for permission entries.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Persists a new permission. Fails with `Conflict` on a duplicate key.
    async fn insert(&self, permission: &Permission) -> AppResult<()>;

    /// Persists permission mutations under an optimistic-concurrency check.
    async fn update(&self, permission: &Permission, expected_version: Version)
    -> AppResult<Version>;

    /// Physically removes a permission and its role bindings.
    async fn hard_delete(&self, key: &PermissionKey) -> AppResult<()>;

    /// Finds a permission by key.
    async fn find_by_key(&self, key: &PermissionKey) -> AppResult<Option<Permission>>;

    /// Lists permissions; soft-deleted rows are included only on request.
    async fn list(&self, include_deleted: bool) -> AppResult<Vec<Permission>>;
}
