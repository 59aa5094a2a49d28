use axum::Json;
use axum::extract::{Extension, Path, State};
use chrono::Utc;
use uuid::Uuid;

use scolaris_core::UserIdentity;
use scolaris_domain::{InvitationId, UserId};

use crate::dto::{InvitationResponse, TeacherInviteRequest};
use crate::error::ApiResult;
use crate::middleware::require_permission;
use crate::state::AppState;

/// `POST /api/teachers/invite-student` — a teacher invites a student by
/// email.
pub async fn teacher_invite_student_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(request): Json<TeacherInviteRequest>,
) -> ApiResult<Json<InvitationResponse>> {
    require_permission(&identity, "invitations.send")?;

    let invitation = state
        .invitations
        .invite_student_to_teacher(
            UserId::from_uuid(identity.subject()),
            &request.email,
            request.message,
            request.expiration_days,
        )
        .await?;

    Ok(Json(InvitationResponse::from_domain(&invitation, Utc::now())))
}

/// `GET /api/invitations/my-invitations` — every invitation addressed to
/// the caller's email, any status.
pub async fn my_invitations_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<InvitationResponse>>> {
    let invitations = state
        .invitations
        .my_invitations(UserId::from_uuid(identity.subject()))
        .await?;

    let now = Utc::now();
    Ok(Json(
        invitations
            .iter()
            .map(|invitation| InvitationResponse::from_domain(invitation, now))
            .collect(),
    ))
}

/// `POST /api/invitations/{id}/accept` — accepts the invitation and forms
/// the relationship in one transaction.
pub async fn accept_invitation_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<()> {
    state
        .invitations
        .accept(
            InvitationId::from_uuid(invitation_id),
            UserId::from_uuid(identity.subject()),
        )
        .await?;
    Ok(())
}

/// `POST /api/invitations/{id}/reject`.
pub async fn reject_invitation_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<()> {
    state
        .invitations
        .reject(
            InvitationId::from_uuid(invitation_id),
            UserId::from_uuid(identity.subject()),
        )
        .await?;
    Ok(())
}
