use super::*;

impl RbacAdminService {
    /// Lists roles; soft-deleted rows only when `include_deleted` is set.
    pub async fn list_roles(&self, include_deleted: bool) -> AppResult<Vec<Role>> {
        self.role_repository.list(include_deleted).await
    }

    /// Creates a custom role.
    pub async fn create_role(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<Role> {
        let role = Role::new(name, description)?;
        self.role_repository.insert(&role).await?;
        tracing::info!(role = %role.name, "created role");
        Ok(role)
    }

    /// Renames a role and updates its description.
    ///
    /// System roles fail with `SystemEntityProtected`; a rename onto an
    /// existing name fails with `Conflict` at the store.
    pub async fn update_role(
        &self,
        role_id: RoleId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<Role> {
        let mut role = self.load_role(role_id).await?;
        let expected_version = role.version;

        role.update(name, description)?;
        role.version = self.role_repository.update(&role, expected_version).await?;
        Ok(role)
    }

    /// Deletes a role: soft by default, physical when `permanent` is set.
    /// Both paths protect system roles.
    pub async fn delete_role(&self, role_id: RoleId, permanent: bool) -> AppResult<()> {
        let mut role = self.load_role(role_id).await?;
        let expected_version = role.version;

        // mark_deleted carries the system-entity check for both paths.
        role.mark_deleted()?;

        if permanent {
            self.role_repository.hard_delete(role_id).await?;
            tracing::info!(role = %role.name, "hard-deleted role");
            return Ok(());
        }

        self.role_repository.update(&role, expected_version).await?;
        tracing::info!(role = %role.name, "soft-deleted role");
        Ok(())
    }

    /// Clears the soft-delete flag on a role.
    pub async fn restore_role(&self, role_id: RoleId) -> AppResult<Role> {
        let mut role = self.load_role(role_id).await?;
        let expected_version = role.version;

        role.restore();
        role.version = self.role_repository.update(&role, expected_version).await?;
        Ok(role)
    }

    /// Binds a permission key to a role. Idempotent.
    pub async fn grant_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()> {
        self.load_role(role_id).await?;
        self.load_permission(key).await?;
        self.role_repository.add_permission(role_id, key).await
    }

    /// Removes a permission binding from a role. Idempotent.
    pub async fn revoke_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()> {
        self.load_role(role_id).await?;
        self.role_repository.remove_permission(role_id, key).await
    }

    /// Lists the permission keys bound to a role.
    pub async fn role_permissions(&self, role_id: RoleId) -> AppResult<Vec<PermissionKey>> {
        self.load_role(role_id).await?;
        self.role_repository.list_permission_keys(role_id).await
    }
}
