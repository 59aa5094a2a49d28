use std::sync::Arc;

use scolaris_core::AppError;
use scolaris_domain::{Permission, PermissionKey, Role};

use crate::ports::rbac::RoleRepository;
use crate::test_support::{InMemoryPermissions, InMemoryRoles};

use super::RbacAdminService;

fn service(roles: Arc<InMemoryRoles>, permissions: Arc<InMemoryPermissions>) -> RbacAdminService {
    RbacAdminService::new(roles, permissions)
}

fn key(value: &str) -> PermissionKey {
    PermissionKey::new(value).unwrap_or_else(|_| panic!("test key"))
}

#[tokio::test]
async fn duplicate_role_name_conflicts() {
    let roles = Arc::new(InMemoryRoles::default());
    let service = service(roles, Arc::new(InMemoryPermissions::default()));

    service
        .create_role("Coordinator", "")
        .await
        .unwrap_or_else(|_| panic!("create"));
    let result = service.create_role("Coordinator", "again").await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn system_role_update_and_delete_are_protected() {
    let roles = Arc::new(InMemoryRoles::default());
    let mut role = Role::new("PlatformAdmin", "built-in").unwrap_or_else(|_| panic!("role"));
    role.is_system = true;
    roles.seed(role.clone()).await;

    let service = service(roles, Arc::new(InMemoryPermissions::default()));

    let update = service.update_role(role.id, "Renamed", "").await;
    assert!(matches!(update, Err(AppError::SystemEntityProtected(_))));

    let soft = service.delete_role(role.id, false).await;
    assert!(matches!(soft, Err(AppError::SystemEntityProtected(_))));

    let hard = service.delete_role(role.id, true).await;
    assert!(matches!(hard, Err(AppError::SystemEntityProtected(_))));
}

#[tokio::test]
async fn soft_deleted_role_is_hidden_until_restored() {
    let roles = Arc::new(InMemoryRoles::default());
    let service = service(roles, Arc::new(InMemoryPermissions::default()));

    let role = service
        .create_role("Coordinator", "")
        .await
        .unwrap_or_else(|_| panic!("create"));
    service
        .delete_role(role.id, false)
        .await
        .unwrap_or_else(|_| panic!("delete"));

    let visible = service
        .list_roles(false)
        .await
        .unwrap_or_else(|_| panic!("list"));
    assert!(visible.is_empty());

    let all = service
        .list_roles(true)
        .await
        .unwrap_or_else(|_| panic!("list all"));
    assert_eq!(all.len(), 1);

    service
        .restore_role(role.id)
        .await
        .unwrap_or_else(|_| panic!("restore"));
    let visible = service
        .list_roles(false)
        .await
        .unwrap_or_else(|_| panic!("list"));
    assert_eq!(visible.len(), 1);
}

#[tokio::test]
async fn hard_delete_removes_custom_role_and_bindings() {
    let roles = Arc::new(InMemoryRoles::default());
    let permissions = Arc::new(InMemoryPermissions::default());
    permissions
        .seed(Permission::new(key("reports.read"), "", "reports"))
        .await;

    let service = service(roles.clone(), permissions);
    let role = service
        .create_role("Analyst", "")
        .await
        .unwrap_or_else(|_| panic!("create"));
    service
        .grant_permission(role.id, &key("reports.read"))
        .await
        .unwrap_or_else(|_| panic!("grant"));

    service
        .delete_role(role.id, true)
        .await
        .unwrap_or_else(|_| panic!("hard delete"));

    assert!(
        roles
            .find_by_id(role.id)
            .await
            .unwrap_or_else(|_| panic!("lookup"))
            .is_none()
    );
    assert!(
        roles
            .list_permission_keys(role.id)
            .await
            .unwrap_or_else(|_| panic!("keys"))
            .is_empty()
    );
}

#[tokio::test]
async fn grant_requires_existing_permission() {
    let roles = Arc::new(InMemoryRoles::default());
    let service = service(roles, Arc::new(InMemoryPermissions::default()));

    let role = service
        .create_role("Analyst", "")
        .await
        .unwrap_or_else(|_| panic!("create"));
    let result = service.grant_permission(role.id, &key("ghost.key")).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn system_permission_is_protected() {
    let permissions = Arc::new(InMemoryPermissions::default());
    let mut permission = Permission::new(key("roles.manage"), "built-in", "roles");
    permission.is_system = true;
    permissions.seed(permission.clone()).await;

    let service = service(Arc::new(InMemoryRoles::default()), permissions);

    let update = service.update_permission(&permission.key, "x", "y").await;
    assert!(matches!(update, Err(AppError::SystemEntityProtected(_))));

    let delete = service.delete_permission(&permission.key, true).await;
    assert!(matches!(delete, Err(AppError::SystemEntityProtected(_))));
}

#[tokio::test]
async fn stale_version_write_is_rejected() {
    let roles = Arc::new(InMemoryRoles::default());
    let service = service(roles.clone(), Arc::new(InMemoryPermissions::default()));

    let role = service
        .create_role("Coordinator", "")
        .await
        .unwrap_or_else(|_| panic!("create"));

    // First writer wins and bumps the stored version.
    service
        .update_role(role.id, "Coordinator", "updated")
        .await
        .unwrap_or_else(|_| panic!("update"));

    // A writer still holding the original version must fail visibly.
    let result = roles.update(&role, role.version).await;
    assert!(matches!(result, Err(AppError::ConcurrencyConflict(_))));
}

#[tokio::test]
async fn permission_soft_delete_and_restore_roundtrip() {
    let permissions = Arc::new(InMemoryPermissions::default());
    let service = service(Arc::new(InMemoryRoles::default()), permissions);

    let permission = service
        .create_permission(key("reports.read"), "Read reports", "reports")
        .await
        .unwrap_or_else(|_| panic!("create"));

    service
        .delete_permission(&permission.key, false)
        .await
        .unwrap_or_else(|_| panic!("delete"));
    assert!(
        service
            .list_permissions(false)
            .await
            .unwrap_or_else(|_| panic!("list"))
            .is_empty()
    );

    service
        .restore_permission(&permission.key)
        .await
        .unwrap_or_else(|_| panic!("restore"));
    assert_eq!(
        service
            .list_permissions(false)
            .await
            .unwrap_or_else(|_| panic!("list"))
            .len(),
        1
    );
}
