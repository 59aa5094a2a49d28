//! Effective-permission resolution and user-role bindings.
//!
//! This is the authorization resolver consumed by every protected endpoint:
//! it computes a user's effective permission set from current role bindings,
//! and keeps role assignment/removal idempotent.

use std::collections::BTreeSet;
use std::sync::Arc;

use scolaris_core::{AppError, AppResult};
use scolaris_domain::{PermissionKey, Role, UserId};

use crate::ports::rbac::RoleRepository;


/// Application service resolving effective permissions from role bindings.
#[derive(Clone)]
pub struct AccessControlService {
    role_repository: Arc<dyn RoleRepository>,
}

impl AccessControlService {
    /// Creates a new access control service.
    #[must_use]
    pub fn new(role_repository: Arc<dyn RoleRepository>) -> Self {
        Self { role_repository }
    }

    /// Computes the user's effective permission set.
    ///
    /// Union, across every role currently bound to the user with
    /// `is_deleted == false`, of all permission keys bound to that role. A
    /// permission reachable via two roles counts once.
    pub async fn resolve_effective_permissions(
        &self,
        user_id: UserId,
    ) -> AppResult<BTreeSet<PermissionKey>> {
        let roles = self.role_repository.list_for_user(user_id).await?;

        let mut effective = BTreeSet::new();
        for role in roles.iter().filter(|role| !role.is_deleted) {
            let keys = self.role_repository.list_permission_keys(role.id).await?;
            effective.extend(keys);
        }

        Ok(effective)
    }

    /// Returns the user's non-deleted roles.
    pub async fn active_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let roles = self.role_repository.list_for_user(user_id).await?;
        Ok(roles.into_iter().filter(|role| !role.is_deleted).collect())
    }

    /// Binds a role to a user by role name. Assigning an already-held role
    /// is a no-op.
    pub async fn assign_role(&self, user_id: UserId, role_name: &str) -> AppResult<()> {
        let role = self
            .role_repository
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_name}' not found")))?;

        self.role_repository.assign_to_user(user_id, role.id).await
    }

    /// Removes a role binding by role name. Removing an unheld role is a
    /// no-op.
    pub async fn remove_role(&self, user_id: UserId, role_name: &str) -> AppResult<()> {
        let role = self
            .role_repository
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_name}' not found")))?;

        self.role_repository
            .remove_from_user(user_id, role.id)
            .await
    }

    /// Ensures the user currently holds the permission, reading live
    /// bindings rather than a token snapshot.
    pub async fn require_permission(&self, user_id: UserId, key: &PermissionKey) -> AppResult<()> {
        let effective = self.resolve_effective_permissions(user_id).await?;
        if effective.contains(key) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{user_id}' is missing permission '{key}'"
        )))
    }
}
