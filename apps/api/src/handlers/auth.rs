use axum::Json;
use axum::extract::State;

use scolaris_domain::InstitutionId;
use scolaris_domain::InstitutionKind;

use crate::dto::{
    ConfirmEmailRequest, ForgotPasswordRequest, IdResponse, LoginRequest,
    RefreshTokenRequest, RegisterInstitutionRequest, RegisterInstitutionResponse,
    RegisterStudentRequest, RegisterTeacherRequest, ResetPasswordRequest, TokenPairResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /api/auth/register-teacher` — anonymous teacher registration.
pub async fn register_teacher_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterTeacherRequest>,
) -> ApiResult<Json<IdResponse>> {
    let user = state
        .users
        .register(&request.email, &request.password, &request.display_name)
        .await?;

    state
        .enrollment
        .create_teacher_profile(user.id, request.specialization)
        .await?;
    state.access_control.assign_role(user.id, "Teacher").await?;

    Ok(Json(IdResponse {
        id: user.id.as_uuid(),
    }))
}

/// `POST /api/auth/register-student` — anonymous student registration.
pub async fn register_student_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterStudentRequest>,
) -> ApiResult<Json<IdResponse>> {
    let user = state
        .users
        .register(&request.email, &request.password, &request.display_name)
        .await?;

    state
        .enrollment
        .create_student_profile(user.id, request.institution_id.map(InstitutionId::from_uuid))
        .await?;
    state.access_control.assign_role(user.id, "Student").await?;

    Ok(Json(IdResponse {
        id: user.id.as_uuid(),
    }))
}

/// `POST /api/auth/register-institution` — anonymous institution
/// registration; creates the owner account, the institution on a trial
/// subscription, and the owner admin link.
pub async fn register_institution_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterInstitutionRequest>,
) -> ApiResult<Json<RegisterInstitutionResponse>> {
    let kind = InstitutionKind::parse(&request.kind)?;
    let (owner, institution) = state
        .institutions
        .register_institution(
            &request.institution_name,
            kind,
            &request.email,
            &request.password,
            &request.display_name,
        )
        .await?;

    state
        .access_control
        .assign_role(owner.id, "InstitutionAdmin")
        .await?;

    Ok(Json(RegisterInstitutionResponse {
        id: owner.id.as_uuid(),
        institution_id: institution.id.as_uuid(),
    }))
}

/// `POST /api/auth/login` — password login, returns a token pair.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let user = state.users.login(&request.email, &request.password).await?;
    let pair = state.tokens.issue_token_pair(&user, None).await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        refresh_expires_at: pair.refresh_expires_at,
    }))
}

/// `POST /api/auth/refresh` — rotates the refresh token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let pair = state.tokens.refresh(&request.refresh_token, None).await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        refresh_expires_at: pair.refresh_expires_at,
    }))
}

/// `POST /api/auth/logout` — revokes the presented refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> ApiResult<()> {
    state
        .tokens
        .revoke(&request.refresh_token, None, "logout")
        .await?;
    Ok(())
}

/// `POST /api/auth/confirm-email`.
pub async fn confirm_email_handler(
    State(state): State<AppState>,
    Json(request): Json<ConfirmEmailRequest>,
) -> ApiResult<()> {
    state.users.confirm_email(&request.email, &request.token).await?;
    Ok(())
}

/// `POST /api/auth/forgot-password` — always succeeds, even for unknown
/// emails.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> ApiResult<()> {
    state.users.forgot_password(&request.email).await?;
    Ok(())
}

/// `POST /api/auth/reset-password`.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    state
        .users
        .reset_password(&request.email, &request.token, &request.new_password)
        .await?;
    Ok(())
}
