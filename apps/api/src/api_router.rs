use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use scolaris_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

/// Builds the full API router: anonymous auth routes plus the
/// bearer-protected surface.
pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/institution/teachers",
            post(handlers::institution::create_teacher_handler),
        )
        .route(
            "/api/institution/students",
            post(handlers::institution::create_student_handler),
        )
        .route(
            "/api/institution/teachers/{id}",
            delete(handlers::relationships::remove_institution_teacher_handler),
        )
        .route(
            "/api/institution/students/{id}",
            delete(handlers::relationships::remove_institution_student_handler),
        )
        .route(
            "/api/institution/invite-teacher",
            post(handlers::institution::invite_to_institution_handler),
        )
        .route(
            "/api/institution/invite-student",
            post(handlers::institution::invite_to_institution_handler),
        )
        .route(
            "/api/institution/license",
            put(handlers::institution::upgrade_license_handler),
        )
        .route(
            "/api/teachers/invite-student",
            post(handlers::invitations::teacher_invite_student_handler),
        )
        .route(
            "/api/teachers/me/assignments",
            get(handlers::relationships::my_assignments_handler),
        )
        .route(
            "/api/teachers/students/{id}",
            delete(handlers::relationships::end_teacher_student_handler),
        )
        .route(
            "/api/teachers/students/{id}/assignments/{subject}",
            post(handlers::relationships::create_assignment_handler),
        )
        .route(
            "/api/invitations/my-invitations",
            get(handlers::invitations::my_invitations_handler),
        )
        .route(
            "/api/invitations/{id}/accept",
            post(handlers::invitations::accept_invitation_handler),
        )
        .route(
            "/api/invitations/{id}/reject",
            post(handlers::invitations::reject_invitation_handler),
        )
        .route(
            "/api/roles",
            get(handlers::rbac::list_roles_handler).post(handlers::rbac::create_role_handler),
        )
        .route(
            "/api/roles/{id}",
            put(handlers::rbac::update_role_handler).delete(handlers::rbac::delete_role_handler),
        )
        .route(
            "/api/roles/{id}/restore",
            post(handlers::rbac::restore_role_handler),
        )
        .route(
            "/api/roles/{id}/permissions/{key}",
            post(handlers::rbac::grant_permission_handler)
                .delete(handlers::rbac::revoke_permission_handler),
        )
        .route(
            "/api/permissions",
            get(handlers::rbac::list_permissions_handler)
                .post(handlers::rbac::create_permission_handler),
        )
        .route(
            "/api/permissions/{key}",
            put(handlers::rbac::update_permission_handler)
                .delete(handlers::rbac::delete_permission_handler),
        )
        .route(
            "/api/permissions/{key}/restore",
            post(handlers::rbac::restore_permission_handler),
        )
        .route(
            "/api/users/{id}/roles/{role}",
            post(handlers::rbac::assign_role_handler).delete(handlers::rbac::remove_role_handler),
        )
        .route(
            "/api/users/me/permissions",
            get(handlers::rbac::my_permissions_handler),
        )
        .route(
            "/api/users/me/institution",
            delete(handlers::relationships::leave_institution_handler),
        )
        .route(
            "/api/students/{id}/education",
            put(handlers::relationships::update_education_handler),
        )
        .route(
            "/api/students/{id}/goals",
            post(handlers::relationships::create_goal_handler),
        )
        .route(
            "/api/goals/{id}/progress",
            put(handlers::relationships::update_goal_progress_handler),
        )
        .layer(from_fn_with_state(app_state.clone(), middleware::require_bearer));

    let public_routes = Router::new()
        .route(
            "/api/auth/register-teacher",
            post(handlers::auth::register_teacher_handler),
        )
        .route(
            "/api/auth/register-student",
            post(handlers::auth::register_student_handler),
        )
        .route(
            "/api/auth/register-institution",
            post(handlers::auth::register_institution_handler),
        )
        .route("/api/auth/login", post(handlers::auth::login_handler))
        .route("/api/auth/refresh", post(handlers::auth::refresh_handler))
        .route("/api/auth/logout", post(handlers::auth::logout_handler))
        .route(
            "/api/auth/confirm-email",
            post(handlers::auth::confirm_email_handler),
        )
        .route(
            "/api/auth/forgot-password",
            post(handlers::auth::forgot_password_handler),
        )
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::reset_password_handler),
        );

    let cors = CorsLayer::new()
        .allow_origin(
            frontend_url
                .parse::<HeaderValue>()
                .map_err(|error| AppError::Internal(format!("invalid frontend url: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, axum::http::header::AUTHORIZATION]);

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}
