//! Request and response bodies for the REST surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scolaris_domain::{
    Institution, Invitation, Permission, Role, StudentProfile, TeacherStudentAssignment,
};

/// Response carrying just a created id.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    /// Created entity id.
    pub id: Uuid,
}

/// Teacher self-registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterTeacherRequest {
    /// Email for the new account.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub display_name: String,
    /// Optional subject specialization.
    pub specialization: Option<String>,
}

/// Student self-registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterStudentRequest {
    /// Email for the new account.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub display_name: String,
    /// Institution to affiliate with, if already known.
    pub institution_id: Option<Uuid>,
}

/// Institution registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterInstitutionRequest {
    /// Institution display name.
    pub institution_name: String,
    /// Institution kind storage value.
    pub kind: String,
    /// Owner account email.
    pub email: String,
    /// Owner account password.
    pub password: String,
    /// Owner display name.
    pub display_name: String,
}

/// Institution registration response.
#[derive(Debug, Serialize)]
pub struct RegisterInstitutionResponse {
    /// Owner user id.
    pub id: Uuid,
    /// Created institution id.
    pub institution_id: Uuid,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Token pair response.
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    /// Signed access token.
    pub access_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// Refresh token expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Refresh / logout request.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    /// Opaque refresh token value.
    pub refresh_token: String,
}

/// Email confirmation request.
#[derive(Debug, Deserialize)]
pub struct ConfirmEmailRequest {
    /// Account email.
    pub email: String,
    /// Raw confirmation token from the activation link.
    pub token: String,
}

/// Forgot-password request.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Account email.
    pub email: String,
}

/// Password reset request.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    /// Account email.
    pub email: String,
    /// Raw reset token from the reset link.
    pub token: String,
    /// New plaintext password.
    pub new_password: String,
}

/// Admin-side staff creation request.
#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    /// Target institution.
    pub institution_id: Uuid,
    /// Email for the new account.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Teacher specialization (teacher creation only).
    pub specialization: Option<String>,
    /// Grade level 1-12 (student creation only).
    pub grade_level: Option<i16>,
}

/// Admin-side staff creation response.
#[derive(Debug, Serialize)]
pub struct CreatedStaffResponse {
    /// Created user id.
    pub id: Uuid,
    /// Plaintext temporary password to hand over.
    pub temporary_password: String,
}

/// Institution invitation request.
#[derive(Debug, Deserialize)]
pub struct InstitutionInviteRequest {
    /// Inviting institution.
    pub institution_id: Uuid,
    /// Invitee email address.
    pub email: String,
    /// Optional message shown to the invitee.
    pub message: Option<String>,
    /// Override of the 7-day expiration window.
    pub expiration_days: Option<i64>,
}

/// Teacher invitation request.
#[derive(Debug, Deserialize)]
pub struct TeacherInviteRequest {
    /// Invitee email address.
    pub email: String,
    /// Optional message shown to the invitee.
    pub message: Option<String>,
    /// Override of the 7-day expiration window.
    pub expiration_days: Option<i64>,
}

/// Invitation as presented to the invitee.
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    /// Invitation id.
    pub id: Uuid,
    /// Invitation kind storage value.
    pub kind: &'static str,
    /// Stored status value.
    pub status: &'static str,
    /// Whether the invitation is still acceptable right now.
    pub is_pending: bool,
    /// Optional message from the inviter.
    pub message: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl InvitationResponse {
    /// Builds the response from a domain invitation at `now`.
    #[must_use]
    pub fn from_domain(invitation: &Invitation, now: DateTime<Utc>) -> Self {
        Self {
            id: invitation.id.as_uuid(),
            kind: invitation.target.kind().as_str(),
            status: invitation.status.as_str(),
            is_pending: invitation.is_pending(now),
            message: invitation.message.clone(),
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
        }
    }
}

/// Role create/update request.
#[derive(Debug, Deserialize)]
pub struct SaveRoleRequest {
    /// Role name.
    pub name: String,
    /// Role description.
    #[serde(default)]
    pub description: String,
}

/// Role as presented to administrators.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    /// Role id.
    pub id: Uuid,
    /// Role name.
    pub name: String,
    /// Role description.
    pub description: String,
    /// Whether this is a protected built-in role.
    pub is_system: bool,
    /// Whether the role is soft-deleted.
    pub is_deleted: bool,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id.as_uuid(),
            name: role.name,
            description: role.description,
            is_system: role.is_system,
            is_deleted: role.is_deleted,
        }
    }
}

/// Permission create/update request.
#[derive(Debug, Deserialize)]
pub struct SavePermissionRequest {
    /// Permission key (create only; ignored on update).
    pub key: Option<String>,
    /// Permission description.
    #[serde(default)]
    pub description: String,
    /// Display group.
    #[serde(default)]
    pub group: String,
}

/// Permission as presented to administrators.
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    /// Permission key.
    pub key: String,
    /// Permission description.
    pub description: String,
    /// Display group.
    pub group: String,
    /// Whether this is a protected built-in permission.
    pub is_system: bool,
    /// Whether the permission is soft-deleted.
    pub is_deleted: bool,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            key: permission.key.as_str().to_owned(),
            description: permission.description,
            group: permission.group,
            is_system: permission.is_system,
            is_deleted: permission.is_deleted,
        }
    }
}

/// Listing query flags for RBAC administration.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    /// Include soft-deleted rows.
    #[serde(default)]
    pub include_deleted: bool,
}

/// Delete query flag shared by role and permission deletion.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Physically remove the row instead of soft-deleting it.
    #[serde(default)]
    pub permanent: bool,
}

/// The caller's effective permissions, resolved from live bindings.
#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    /// Deduplicated permission keys.
    pub permissions: Vec<String>,
}

/// License upgrade request.
#[derive(Debug, Deserialize)]
pub struct UpgradeLicenseRequest {
    /// Target institution.
    pub institution_id: Uuid,
    /// New license tier storage value.
    pub tier: String,
    /// New student capacity.
    pub max_students: i32,
    /// New teacher capacity.
    pub max_teachers: i32,
    /// New subscription end; `None` means open-ended.
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

/// Institution as presented to administrators.
#[derive(Debug, Serialize)]
pub struct InstitutionResponse {
    /// Institution id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Kind storage value.
    pub kind: &'static str,
    /// License tier storage value.
    pub license: &'static str,
    /// Student capacity.
    pub max_students: i32,
    /// Teacher capacity.
    pub max_teachers: i32,
    /// Subscription end, if bounded.
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

impl From<Institution> for InstitutionResponse {
    fn from(institution: Institution) -> Self {
        Self {
            id: institution.id.as_uuid(),
            name: institution.name,
            kind: institution.kind.as_str(),
            license: institution.license.as_str(),
            max_students: institution.limits.max_students,
            max_teachers: institution.limits.max_teachers,
            subscription_ends_at: institution.subscription_ends_at,
        }
    }
}

/// Education info update request.
#[derive(Debug, Deserialize)]
pub struct UpdateEducationRequest {
    /// Grade level 1-12.
    pub grade_level: Option<i16>,
    /// School attended outside the platform.
    pub school_name: Option<String>,
}

/// Student profile as presented to staff.
#[derive(Debug, Serialize)]
pub struct StudentProfileResponse {
    /// Profile id.
    pub id: Uuid,
    /// Owning user id.
    pub user_id: Uuid,
    /// Affiliated institution, if any.
    pub institution_id: Option<Uuid>,
    /// Grade level.
    pub grade_level: Option<i16>,
    /// School name.
    pub school_name: Option<String>,
}

impl From<StudentProfile> for StudentProfileResponse {
    fn from(profile: StudentProfile) -> Self {
        Self {
            id: profile.id.as_uuid(),
            user_id: profile.user_id.as_uuid(),
            institution_id: profile.institution_id.map(|id| id.as_uuid()),
            grade_level: profile.grade_level,
            school_name: profile.school_name,
        }
    }
}

/// Goal creation request.
#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    /// Goal title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
}

/// Goal progress update request.
#[derive(Debug, Deserialize)]
pub struct UpdateGoalProgressRequest {
    /// Progress percentage 0-100.
    pub progress: i16,
}

/// Goal as presented to students and staff.
#[derive(Debug, Serialize)]
pub struct GoalResponse {
    /// Goal id.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Progress percentage.
    pub progress: i16,
    /// Whether the goal is completed.
    pub is_completed: bool,
    /// Completion instant, if completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<scolaris_domain::AcademicGoal> for GoalResponse {
    fn from(goal: scolaris_domain::AcademicGoal) -> Self {
        Self {
            id: goal.id.as_uuid(),
            title: goal.title,
            progress: goal.progress,
            is_completed: goal.is_completed,
            completed_at: goal.completed_at,
        }
    }
}

/// Assignment as presented to teachers and students.
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    /// Assignment id.
    pub id: Uuid,
    /// Teacher profile id.
    pub teacher_id: Uuid,
    /// Student profile id.
    pub student_id: Uuid,
    /// Subject taught.
    pub subject: String,
    /// Whether the pairing is active.
    pub is_active: bool,
    /// Start instant.
    pub started_at: DateTime<Utc>,
    /// End instant, if ended.
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<TeacherStudentAssignment> for AssignmentResponse {
    fn from(assignment: TeacherStudentAssignment) -> Self {
        Self {
            id: assignment.id.as_uuid(),
            teacher_id: assignment.teacher_id.as_uuid(),
            student_id: assignment.student_id.as_uuid(),
            subject: assignment.subject,
            is_active: assignment.is_active,
            started_at: assignment.started_at,
            ended_at: assignment.ended_at,
        }
    }
}
