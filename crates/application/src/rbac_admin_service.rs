//! Role and permission administration.
//!
//! Admin-facing CRUD for the dynamic RBAC graph. System entries are
//! protected from rename and deletion; custom entries support soft delete
//! (hidden from listings, kept resolvable), restore, and hard delete.

use std::sync::Arc;

use scolaris_core::{AppError, AppResult};
use scolaris_domain::{Permission, PermissionKey, Role, RoleId};

use crate::ports::rbac::{PermissionRepository, RoleRepository};

mod permissions;
mod roles;

#[cfg(test)]
mod tests;

/// Application service for RBAC administration.
#[derive(Clone)]
pub struct RbacAdminService {
    role_repository: Arc<dyn RoleRepository>,
    permission_repository: Arc<dyn PermissionRepository>,
}

impl RbacAdminService {
    /// Creates a new RBAC admin service.
    #[must_use]
    pub fn new(
        role_repository: Arc<dyn RoleRepository>,
        permission_repository: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            role_repository,
            permission_repository,
        }
    }

    async fn load_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.role_repository
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role {role_id} not found")))
    }

    async fn load_permission(&self, key: &PermissionKey) -> AppResult<Permission> {
        self.permission_repository
            .find_by_key(key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("permission '{key}' not found")))
    }
}
