use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use scolaris_core::UserIdentity;
use scolaris_domain::{PermissionKey, RoleId, UserId};

use crate::dto::{
    DeleteQuery, EffectivePermissionsResponse, ListingQuery, PermissionResponse, RoleResponse,
    SavePermissionRequest, SaveRoleRequest,
};
use crate::error::ApiResult;
use crate::middleware::require_permission;
use crate::state::AppState;

/// `GET /api/roles` — lists roles; `?include_deleted=true` shows
/// soft-deleted rows.
pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    require_permission(&identity, "roles.manage")?;

    let roles = state.rbac_admin.list_roles(query.include_deleted).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

/// `POST /api/roles` — creates a custom role.
pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(request): Json<SaveRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    require_permission(&identity, "roles.manage")?;

    let role = state
        .rbac_admin
        .create_role(request.name, request.description)
        .await?;
    Ok(Json(RoleResponse::from(role)))
}

/// `PUT /api/roles/{id}` — renames a role; system roles are protected.
pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
    Json(request): Json<SaveRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    require_permission(&identity, "roles.manage")?;

    let role = state
        .rbac_admin
        .update_role(RoleId::from_uuid(role_id), request.name, request.description)
        .await?;
    Ok(Json(RoleResponse::from(role)))
}

/// `DELETE /api/roles/{id}` — soft delete by default, physical with
/// `?permanent=true`; system roles are protected either way.
pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<()> {
    require_permission(&identity, "roles.manage")?;

    state
        .rbac_admin
        .delete_role(RoleId::from_uuid(role_id), query.permanent)
        .await?;
    Ok(())
}

/// `POST /api/roles/{id}/restore` — clears the soft-delete flag.
pub async fn restore_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    require_permission(&identity, "roles.manage")?;

    let role = state
        .rbac_admin
        .restore_role(RoleId::from_uuid(role_id))
        .await?;
    Ok(Json(RoleResponse::from(role)))
}

/// `POST /api/roles/{id}/permissions/{key}` — binds a permission to a
/// role.
pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((role_id, key)): Path<(Uuid, String)>,
) -> ApiResult<()> {
    require_permission(&identity, "roles.manage")?;

    let key = PermissionKey::new(key)?;
    state
        .rbac_admin
        .grant_permission(RoleId::from_uuid(role_id), &key)
        .await?;
    Ok(())
}

/// `DELETE /api/roles/{id}/permissions/{key}` — removes a binding.
pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((role_id, key)): Path<(Uuid, String)>,
) -> ApiResult<()> {
    require_permission(&identity, "roles.manage")?;

    let key = PermissionKey::new(key)?;
    state
        .rbac_admin
        .revoke_permission(RoleId::from_uuid(role_id), &key)
        .await?;
    Ok(())
}

/// `GET /api/permissions`.
pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    require_permission(&identity, "permissions.manage")?;

    let permissions = state
        .rbac_admin
        .list_permissions(query.include_deleted)
        .await?;
    Ok(Json(
        permissions
            .into_iter()
            .map(PermissionResponse::from)
            .collect(),
    ))
}

/// `POST /api/permissions` — creates a custom permission.
pub async fn create_permission_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(request): Json<SavePermissionRequest>,
) -> ApiResult<Json<PermissionResponse>> {
    require_permission(&identity, "permissions.manage")?;

    let key = PermissionKey::new(request.key.unwrap_or_default())?;
    let permission = state
        .rbac_admin
        .create_permission(key, request.description, request.group)
        .await?;
    Ok(Json(PermissionResponse::from(permission)))
}

/// `PUT /api/permissions/{key}` — updates description and group; system
/// permissions are protected.
pub async fn update_permission_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(key): Path<String>,
    Json(request): Json<SavePermissionRequest>,
) -> ApiResult<Json<PermissionResponse>> {
    require_permission(&identity, "permissions.manage")?;

    let key = PermissionKey::new(key)?;
    let permission = state
        .rbac_admin
        .update_permission(&key, request.description, request.group)
        .await?;
    Ok(Json(PermissionResponse::from(permission)))
}

/// `DELETE /api/permissions/{key}` — soft delete by default, physical
/// with `?permanent=true`.
pub async fn delete_permission_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(key): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<()> {
    require_permission(&identity, "permissions.manage")?;

    let key = PermissionKey::new(key)?;
    state
        .rbac_admin
        .delete_permission(&key, query.permanent)
        .await?;
    Ok(())
}

/// `POST /api/permissions/{key}/restore`.
pub async fn restore_permission_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(key): Path<String>,
) -> ApiResult<Json<PermissionResponse>> {
    require_permission(&identity, "permissions.manage")?;

    let key = PermissionKey::new(key)?;
    let permission = state.rbac_admin.restore_permission(&key).await?;
    Ok(Json(PermissionResponse::from(permission)))
}

/// `POST /api/users/{id}/roles/{role}` — binds a role to a user;
/// idempotent.
pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((user_id, role_name)): Path<(Uuid, String)>,
) -> ApiResult<()> {
    require_permission(&identity, "roles.manage")?;

    state
        .access_control
        .assign_role(UserId::from_uuid(user_id), &role_name)
        .await?;
    Ok(())
}

/// `DELETE /api/users/{id}/roles/{role}` — removes a binding; idempotent.
pub async fn remove_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((user_id, role_name)): Path<(Uuid, String)>,
) -> ApiResult<()> {
    require_permission(&identity, "roles.manage")?;

    state
        .access_control
        .remove_role(UserId::from_uuid(user_id), &role_name)
        .await?;
    Ok(())
}

/// `GET /api/users/me/permissions` — the caller's effective permission
/// set, resolved from live bindings rather than the token snapshot.
pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let permissions = state
        .access_control
        .resolve_effective_permissions(UserId::from_uuid(identity.subject()))
        .await?;

    Ok(Json(EffectivePermissionsResponse {
        permissions: permissions.into_iter().map(String::from).collect(),
    }))
}
