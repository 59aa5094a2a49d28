use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use scolaris_core::{AppError, UserIdentity};

use crate::error::ApiError;
use crate::state::AppState;

/// Bearer-token middleware: verifies the access token and attaches the
/// caller's [`UserIdentity`] (a snapshot of role/permission claims from
/// mint time) as a request extension.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            ApiError(AppError::Unauthorized(
                "missing authorization header".to_owned(),
            ))
        })?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError(AppError::Unauthorized(
            "authorization header must use the Bearer scheme".to_owned(),
        ))
    })?;

    let claims = state.token_signer.verify(token)?;
    let identity = UserIdentity::new(
        claims.subject.as_uuid(),
        claims.email,
        claims.roles,
        claims.permissions,
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Ensures the token snapshot carries a permission claim.
pub fn require_permission(identity: &UserIdentity, key: &str) -> Result<(), ApiError> {
    if identity.has_permission(key) {
        return Ok(());
    }

    Err(ApiError(AppError::Forbidden(format!(
        "missing permission '{key}'"
    ))))
}
