use axum::Json;
use axum::extract::{Extension, State};
use chrono::Utc;

use scolaris_core::UserIdentity;
use scolaris_domain::{CapacityLimits, InstitutionId, LicenseTier, UserId};

use crate::dto::{
    CreateStaffRequest, CreatedStaffResponse, InstitutionInviteRequest, InstitutionResponse,
    InvitationResponse, UpgradeLicenseRequest,
};
use crate::error::ApiResult;
use crate::middleware::require_permission;
use crate::state::AppState;

/// `POST /api/institution/teachers` — admin creates an affiliated teacher
/// account; returns the id and a temporary password.
pub async fn create_teacher_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(request): Json<CreateStaffRequest>,
) -> ApiResult<Json<CreatedStaffResponse>> {
    require_permission(&identity, "institution.staff.manage")?;

    let created = state
        .institutions
        .create_teacher_account(
            UserId::from_uuid(identity.subject()),
            InstitutionId::from_uuid(request.institution_id),
            &request.email,
            &request.display_name,
            request.specialization,
        )
        .await?;
    state
        .access_control
        .assign_role(created.user_id, "Teacher")
        .await?;

    Ok(Json(CreatedStaffResponse {
        id: created.user_id.as_uuid(),
        temporary_password: created.temporary_password,
    }))
}

/// `POST /api/institution/students` — admin creates an affiliated student
/// account; returns the id and a temporary password.
pub async fn create_student_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(request): Json<CreateStaffRequest>,
) -> ApiResult<Json<CreatedStaffResponse>> {
    require_permission(&identity, "institution.staff.manage")?;

    let created = state
        .institutions
        .create_student_account(
            UserId::from_uuid(identity.subject()),
            InstitutionId::from_uuid(request.institution_id),
            &request.email,
            &request.display_name,
            request.grade_level,
        )
        .await?;
    state
        .access_control
        .assign_role(created.user_id, "Student")
        .await?;

    Ok(Json(CreatedStaffResponse {
        id: created.user_id.as_uuid(),
        temporary_password: created.temporary_password,
    }))
}

/// `POST /api/institution/invite-teacher` and
/// `POST /api/institution/invite-student` — create an institution
/// invitation; the invitee's profile flavor decides the affiliation at
/// acceptance time.
pub async fn invite_to_institution_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(request): Json<InstitutionInviteRequest>,
) -> ApiResult<Json<InvitationResponse>> {
    require_permission(&identity, "invitations.send")?;

    let invitation = state
        .invitations
        .invite_to_institution(
            UserId::from_uuid(identity.subject()),
            InstitutionId::from_uuid(request.institution_id),
            &request.email,
            request.message,
            request.expiration_days,
        )
        .await?;

    Ok(Json(InvitationResponse::from_domain(&invitation, Utc::now())))
}

/// `PUT /api/institution/license` — owner-only license upgrade.
pub async fn upgrade_license_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(request): Json<UpgradeLicenseRequest>,
) -> ApiResult<Json<InstitutionResponse>> {
    require_permission(&identity, "institution.manage")?;

    let tier = LicenseTier::parse(&request.tier)?;
    let institution = state
        .institutions
        .upgrade_license(
            UserId::from_uuid(identity.subject()),
            InstitutionId::from_uuid(request.institution_id),
            tier,
            CapacityLimits {
                max_students: request.max_students,
                max_teachers: request.max_teachers,
            },
            request.subscription_ends_at,
        )
        .await?;

    Ok(Json(InstitutionResponse::from(institution)))
}
