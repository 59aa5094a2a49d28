use axum::Json;
use axum::extract::{Extension, Path, State};
use uuid::Uuid;

use scolaris_core::{AppError, UserIdentity};
use scolaris_domain::{GoalId, StudentId, TeacherId, UserId};

use crate::dto::{
    AssignmentResponse, CreateGoalRequest, GoalResponse, StudentProfileResponse,
    UpdateEducationRequest, UpdateGoalProgressRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::require_permission;
use crate::state::AppState;

/// `DELETE /api/institution/teachers/{id}` — admin removes a teacher from
/// the institution; the teacher becomes independent again.
pub async fn remove_institution_teacher_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(teacher_id): Path<Uuid>,
) -> ApiResult<()> {
    require_permission(&identity, "institution.staff.manage")?;
    let teacher_id = TeacherId::from_uuid(teacher_id);

    // The caller must administer the institution the teacher belongs to.
    let profile = state.enrollment.teacher(teacher_id).await?;
    if let Some(institution_id) = profile.institution_id {
        state
            .institutions
            .require_admin(UserId::from_uuid(identity.subject()), institution_id)
            .await?;
    }

    let removed = state
        .enrollment
        .remove_teacher_from_institution(teacher_id)
        .await?;
    tracing::info!(teacher = %removed.id, "removed teacher from institution");
    Ok(())
}

/// `DELETE /api/institution/students/{id}` — admin removes a student's
/// affiliation.
pub async fn remove_institution_student_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(student_id): Path<Uuid>,
) -> ApiResult<()> {
    require_permission(&identity, "institution.staff.manage")?;
    let student_id = StudentId::from_uuid(student_id);

    let profile = state.enrollment.student(student_id).await?;
    if let Some(institution_id) = profile.institution_id {
        state
            .institutions
            .require_admin(UserId::from_uuid(identity.subject()), institution_id)
            .await?;
    }

    state
        .enrollment
        .remove_student_from_institution(student_id)
        .await?;
    Ok(())
}

/// `DELETE /api/teachers/students/{id}` — the acting teacher ends every
/// active assignment with the student; rows stay for history.
pub async fn end_teacher_student_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(student_id): Path<Uuid>,
) -> ApiResult<()> {
    require_permission(&identity, "students.manage")?;

    let teacher = state
        .enrollment
        .require_teacher_by_user(UserId::from_uuid(identity.subject()))
        .await?;
    let student_id = StudentId::from_uuid(student_id);

    let active = state
        .enrollment
        .assignments_for_teacher(teacher.id, false)
        .await?;
    let mut ended = 0usize;
    for assignment in active
        .iter()
        .filter(|assignment| assignment.student_id == student_id)
    {
        state.enrollment.end_assignment(assignment.id).await?;
        ended += 1;
    }

    if ended == 0 {
        return Err(ApiError(AppError::NotFound(format!(
            "no active assignment with student {student_id}"
        ))));
    }

    Ok(())
}

/// `DELETE /api/users/me/institution` — the caller leaves their
/// institution (teacher or student profile).
pub async fn leave_institution_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<()> {
    let user_id = UserId::from_uuid(identity.subject());

    if let Ok(teacher) = state.enrollment.require_teacher_by_user(user_id).await {
        state
            .enrollment
            .remove_teacher_from_institution(teacher.id)
            .await?;
        return Ok(());
    }

    let student = state.enrollment.require_student_by_user(user_id).await?;
    state
        .enrollment
        .remove_student_from_institution(student.id)
        .await?;
    Ok(())
}

/// `POST /api/teachers/students/{id}/assignments/{subject}` — creates an
/// assignment; a duplicate triple is a silent no-op.
pub async fn create_assignment_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((student_id, subject)): Path<(Uuid, String)>,
) -> ApiResult<()> {
    require_permission(&identity, "students.manage")?;

    let teacher = state
        .enrollment
        .require_teacher_by_user(UserId::from_uuid(identity.subject()))
        .await?;
    state
        .enrollment
        .create_assignment(teacher.id, StudentId::from_uuid(student_id), &subject)
        .await?;
    Ok(())
}

/// `GET /api/teachers/me/assignments` — the acting teacher's active
/// assignments.
pub async fn my_assignments_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<AssignmentResponse>>> {
    let teacher = state
        .enrollment
        .require_teacher_by_user(UserId::from_uuid(identity.subject()))
        .await?;
    let assignments = state
        .enrollment
        .assignments_for_teacher(teacher.id, false)
        .await?;

    Ok(Json(
        assignments.into_iter().map(AssignmentResponse::from).collect(),
    ))
}

/// `PUT /api/students/{id}/education` — updates grade level (1-12) and
/// school name.
pub async fn update_education_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<UpdateEducationRequest>,
) -> ApiResult<Json<StudentProfileResponse>> {
    require_permission(&identity, "students.manage")?;

    let profile = state
        .enrollment
        .update_education_info(
            StudentId::from_uuid(student_id),
            request.grade_level,
            request.school_name,
        )
        .await?;
    Ok(Json(StudentProfileResponse::from(profile)))
}

/// `POST /api/students/{id}/goals`.
pub async fn create_goal_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<CreateGoalRequest>,
) -> ApiResult<Json<GoalResponse>> {
    require_permission(&identity, "goals.manage")?;

    let goal = state
        .enrollment
        .create_goal(
            StudentId::from_uuid(student_id),
            &request.title,
            request.description,
        )
        .await?;
    Ok(Json(GoalResponse::from(goal)))
}

/// `PUT /api/goals/{id}/progress` — 100 completes the goal, regressing
/// below 100 re-opens it.
pub async fn update_goal_progress_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(goal_id): Path<Uuid>,
    Json(request): Json<UpdateGoalProgressRequest>,
) -> ApiResult<Json<GoalResponse>> {
    require_permission(&identity, "goals.manage")?;

    let goal = state
        .enrollment
        .update_goal_progress(GoalId::from_uuid(goal_id), request.progress)
        .await?;
    Ok(Json(GoalResponse::from(goal)))
}
