use super::*;

impl RbacAdminService {
    /// Lists permissions; soft-deleted rows only when `include_deleted` is
    /// set.
    pub async fn list_permissions(&self, include_deleted: bool) -> AppResult<Vec<Permission>> {
        self.permission_repository.list(include_deleted).await
    }

    /// Creates a custom permission.
    pub async fn create_permission(
        &self,
        key: PermissionKey,
        description: impl Into<String>,
        group: impl Into<String>,
    ) -> AppResult<Permission> {
        let permission = Permission::new(key, description, group);
        self.permission_repository.insert(&permission).await?;
        tracing::info!(permission = %permission.key, "created permission");
        Ok(permission)
    }

    /// Updates a permission's description and group.
    ///
    /// System permissions fail with `SystemEntityProtected`.
    pub async fn update_permission(
        &self,
        key: &PermissionKey,
        description: impl Into<String>,
        group: impl Into<String>,
    ) -> AppResult<Permission> {
        let mut permission = self.load_permission(key).await?;
        let expected_version = permission.version;

        permission.update(description, group)?;
        permission.version = self
            .permission_repository
            .update(&permission, expected_version)
            .await?;
        Ok(permission)
    }

    /// Deletes a permission: soft by default, physical when `permanent` is
    /// set. Both paths protect system permissions.
    pub async fn delete_permission(&self, key: &PermissionKey, permanent: bool) -> AppResult<()> {
        let mut permission = self.load_permission(key).await?;
        let expected_version = permission.version;

        permission.mark_deleted()?;

        if permanent {
            self.permission_repository.hard_delete(key).await?;
            tracing::info!(permission = %key, "hard-deleted permission");
            return Ok(());
        }

        self.permission_repository
            .update(&permission, expected_version)
            .await?;
        tracing::info!(permission = %key, "soft-deleted permission");
        Ok(())
    }

    /// Clears the soft-delete flag on a permission.
    pub async fn restore_permission(&self, key: &PermissionKey) -> AppResult<Permission> {
        let mut permission = self.load_permission(key).await?;
        let expected_version = permission.version;

        permission.restore();
        permission.version = self
            .permission_repository
            .update(&permission, expected_version)
            .await?;
        Ok(permission)
    }
}
