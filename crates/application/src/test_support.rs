//! In-memory port implementations shared by service tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use scolaris_core::{AppError, AppResult, Version};
use scolaris_domain::{
    AcademicGoal, AssignmentId, GoalId, Institution, InstitutionAdmin, InstitutionId, Invitation,
    InvitationId, InvitationStatus, ParentId, ParentProfile, Permission, PermissionKey,
    PlatformEvent, RefreshToken, Role, RoleId, StudentId, StudentProfile, TeacherId,
    TeacherProfile, TeacherStudentAssignment, User, UserId,
};
use tokio::sync::Mutex;

use crate::ports::enrollment::{
    AssignmentRepository, GoalRepository, ParentProfileRepository, StudentProfileRepository,
    TeacherProfileRepository,
};
use crate::ports::identity::{EventPublisher, PasswordHasher, UserRepository};
use crate::ports::invitations::{AcceptanceMutation, AcceptanceUnitOfWork, InvitationRepository};
use crate::ports::rbac::{PermissionRepository, RoleRepository};
use crate::ports::registry::{InstitutionAdminRepository, InstitutionRepository};
use crate::ports::tokens::{AccessTokenClaims, AccessTokenSigner, RefreshTokenRepository, SettingsStore};

fn stale(entity: &str) -> AppError {
    AppError::ConcurrencyConflict(format!("stale version for {entity}"))
}

/// In-memory user repository.
#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.email == user.email) {
            return Err(AppError::Conflict(format!(
                "email '{}' is already registered",
                user.email.as_str()
            )));
        }
        rows.push(user.clone());
        Ok(())
    }

    async fn update(&self, user: &User, expected_version: Version) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == user.id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", user.id)))?;
        if row.version != expected_version {
            return Err(stale("user"));
        }
        let mut updated = user.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.email.as_str() == email)
            .cloned())
    }
}

/// Deterministic password hasher for tests.
pub struct FakePasswordHasher;

impl PasswordHasher for FakePasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(format!("hashed:{password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash == format!("hashed:{password}"))
    }
}

/// Event publisher collecting events for assertions.
#[derive(Default)]
pub struct CollectingEventPublisher {
    events: Mutex<Vec<PlatformEvent>>,
}

impl CollectingEventPublisher {
    /// Returns the published events.
    pub async fn events(&self) -> Vec<PlatformEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for CollectingEventPublisher {
    async fn publish(&self, event: PlatformEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// In-memory role repository with permission and user bindings.
#[derive(Default)]
pub struct InMemoryRoles {
    rows: Mutex<Vec<Role>>,
    role_permissions: Mutex<HashSet<(RoleId, PermissionKey)>>,
    user_roles: Mutex<HashSet<(UserId, RoleId)>>,
}

impl InMemoryRoles {
    /// Seeds a stored role.
    pub async fn seed(&self, role: Role) {
        self.rows.lock().await.push(role);
    }

    /// Returns the number of bindings between a user and a role.
    pub async fn binding_count(&self, user_id: UserId, role_id: RoleId) -> usize {
        usize::from(self.user_roles.lock().await.contains(&(user_id, role_id)))
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoles {
    async fn insert(&self, role: &Role) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.name == role.name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        rows.push(role.clone());
        Ok(())
    }

    async fn update(&self, role: &Role, expected_version: Version) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == role.id)
            .ok_or_else(|| AppError::NotFound(format!("role {}", role.id)))?;
        if row.version != expected_version {
            return Err(stale("role"));
        }
        let mut updated = role.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn hard_delete(&self, role_id: RoleId) -> AppResult<()> {
        self.rows.lock().await.retain(|row| row.id != role_id);
        self.role_permissions
            .lock()
            .await
            .retain(|(bound_role, _)| *bound_role != role_id);
        self.user_roles
            .lock()
            .await
            .retain(|(_, bound_role)| *bound_role != role_id);
        Ok(())
    }

    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == role_id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.name == name)
            .cloned())
    }

    async fn list(&self, include_deleted: bool) -> AppResult<Vec<Role>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| include_deleted || !row.is_deleted)
            .cloned()
            .collect())
    }

    async fn add_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()> {
        self.role_permissions
            .lock()
            .await
            .insert((role_id, key.clone()));
        Ok(())
    }

    async fn remove_permission(&self, role_id: RoleId, key: &PermissionKey) -> AppResult<()> {
        self.role_permissions
            .lock()
            .await
            .remove(&(role_id, key.clone()));
        Ok(())
    }

    async fn list_permission_keys(&self, role_id: RoleId) -> AppResult<Vec<PermissionKey>> {
        Ok(self
            .role_permissions
            .lock()
            .await
            .iter()
            .filter(|(bound_role, _)| *bound_role == role_id)
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn assign_to_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        self.user_roles.lock().await.insert((user_id, role_id));
        Ok(())
    }

    async fn remove_from_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        self.user_roles.lock().await.remove(&(user_id, role_id));
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let bindings = self.user_roles.lock().await;
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| bindings.contains(&(user_id, row.id)))
            .cloned()
            .collect())
    }
}

/// In-memory permission repository.
#[derive(Default)]
pub struct InMemoryPermissions {
    rows: Mutex<Vec<Permission>>,
}

impl InMemoryPermissions {
    /// Seeds a stored permission.
    pub async fn seed(&self, permission: Permission) {
        self.rows.lock().await.push(permission);
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissions {
    async fn insert(&self, permission: &Permission) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.key == permission.key) {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.key
            )));
        }
        rows.push(permission.clone());
        Ok(())
    }

    async fn update(
        &self,
        permission: &Permission,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.key == permission.key)
            .ok_or_else(|| AppError::NotFound(format!("permission {}", permission.key)))?;
        if row.version != expected_version {
            return Err(stale("permission"));
        }
        let mut updated = permission.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn hard_delete(&self, key: &PermissionKey) -> AppResult<()> {
        self.rows.lock().await.retain(|row| row.key != *key);
        Ok(())
    }

    async fn find_by_key(&self, key: &PermissionKey) -> AppResult<Option<Permission>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.key == *key)
            .cloned())
    }

    async fn list(&self, include_deleted: bool) -> AppResult<Vec<Permission>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| include_deleted || !row.is_deleted)
            .cloned()
            .collect())
    }
}

/// In-memory institution repository with settable affiliation counts.
#[derive(Default)]
pub struct InMemoryInstitutions {
    rows: Mutex<Vec<Institution>>,
    student_counts: Mutex<HashMap<InstitutionId, i64>>,
    teacher_counts: Mutex<HashMap<InstitutionId, i64>>,
}

impl InMemoryInstitutions {
    /// Seeds a stored institution.
    pub async fn seed(&self, institution: Institution) {
        self.rows.lock().await.push(institution);
    }

    /// Sets the active affiliation counts returned for an institution.
    pub async fn set_counts(&self, institution_id: InstitutionId, students: i64, teachers: i64) {
        self.student_counts
            .lock()
            .await
            .insert(institution_id, students);
        self.teacher_counts
            .lock()
            .await
            .insert(institution_id, teachers);
    }
}

#[async_trait]
impl InstitutionRepository for InMemoryInstitutions {
    async fn insert(&self, institution: &Institution) -> AppResult<()> {
        self.rows.lock().await.push(institution.clone());
        Ok(())
    }

    async fn update(
        &self,
        institution: &Institution,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == institution.id)
            .ok_or_else(|| AppError::NotFound(format!("institution {}", institution.id)))?;
        if row.version != expected_version {
            return Err(stale("institution"));
        }
        let mut updated = institution.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find_by_id(&self, institution_id: InstitutionId) -> AppResult<Option<Institution>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == institution_id)
            .cloned())
    }

    async fn count_active_students(&self, institution_id: InstitutionId) -> AppResult<i64> {
        Ok(self
            .student_counts
            .lock()
            .await
            .get(&institution_id)
            .copied()
            .unwrap_or(0))
    }

    async fn count_active_teachers(&self, institution_id: InstitutionId) -> AppResult<i64> {
        Ok(self
            .teacher_counts
            .lock()
            .await
            .get(&institution_id)
            .copied()
            .unwrap_or(0))
    }
}

/// In-memory institution admin repository.
#[derive(Default)]
pub struct InMemoryAdmins {
    rows: Mutex<Vec<InstitutionAdmin>>,
}

#[async_trait]
impl InstitutionAdminRepository for InMemoryAdmins {
    async fn insert(&self, admin: &InstitutionAdmin) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows
            .iter()
            .any(|row| row.user_id == admin.user_id && row.institution_id == admin.institution_id)
        {
            return Err(AppError::Conflict(
                "user is already an admin of this institution".to_owned(),
            ));
        }
        rows.push(admin.clone());
        Ok(())
    }

    async fn update(
        &self,
        admin: &InstitutionAdmin,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| {
                row.user_id == admin.user_id && row.institution_id == admin.institution_id
            })
            .ok_or_else(|| AppError::NotFound("institution admin".to_owned()))?;
        if row.version != expected_version {
            return Err(stale("institution admin"));
        }
        let mut updated = admin.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find(
        &self,
        user_id: UserId,
        institution_id: InstitutionId,
    ) -> AppResult<Option<InstitutionAdmin>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.user_id == user_id && row.institution_id == institution_id)
            .cloned())
    }

    async fn find_for_user(&self, user_id: UserId) -> AppResult<Option<InstitutionAdmin>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.user_id == user_id)
            .cloned())
    }

    async fn list_for_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<InstitutionAdmin>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.institution_id == institution_id)
            .cloned()
            .collect())
    }
}

/// In-memory teacher profile repository.
#[derive(Default)]
pub struct InMemoryTeacherProfiles {
    rows: Mutex<Vec<TeacherProfile>>,
}

impl InMemoryTeacherProfiles {
    /// Seeds a stored profile.
    pub async fn seed(&self, profile: TeacherProfile) {
        self.rows.lock().await.push(profile);
    }
}

#[async_trait]
impl TeacherProfileRepository for InMemoryTeacherProfiles {
    async fn insert(&self, profile: &TeacherProfile) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.user_id == profile.user_id) {
            return Err(AppError::Conflict(
                "user already owns a teacher profile".to_owned(),
            ));
        }
        rows.push(profile.clone());
        Ok(())
    }

    async fn update(
        &self,
        profile: &TeacherProfile,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == profile.id)
            .ok_or_else(|| AppError::NotFound(format!("teacher profile {}", profile.id)))?;
        if row.version != expected_version {
            return Err(stale("teacher profile"));
        }
        let mut updated = profile.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find_by_id(&self, teacher_id: TeacherId) -> AppResult<Option<TeacherProfile>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == teacher_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<TeacherProfile>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.user_id == user_id)
            .cloned())
    }

    async fn list_by_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<TeacherProfile>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.institution_id == Some(institution_id))
            .cloned()
            .collect())
    }
}

/// In-memory student profile repository.
#[derive(Default)]
pub struct InMemoryStudentProfiles {
    rows: Mutex<Vec<StudentProfile>>,
}

impl InMemoryStudentProfiles {
    /// Seeds a stored profile.
    pub async fn seed(&self, profile: StudentProfile) {
        self.rows.lock().await.push(profile);
    }
}

#[async_trait]
impl StudentProfileRepository for InMemoryStudentProfiles {
    async fn insert(&self, profile: &StudentProfile) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.user_id == profile.user_id) {
            return Err(AppError::Conflict(
                "user already owns a student profile".to_owned(),
            ));
        }
        rows.push(profile.clone());
        Ok(())
    }

    async fn update(
        &self,
        profile: &StudentProfile,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == profile.id)
            .ok_or_else(|| AppError::NotFound(format!("student profile {}", profile.id)))?;
        if row.version != expected_version {
            return Err(stale("student profile"));
        }
        let mut updated = profile.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find_by_id(&self, student_id: StudentId) -> AppResult<Option<StudentProfile>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == student_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<StudentProfile>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.user_id == user_id)
            .cloned())
    }

    async fn list_by_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<StudentProfile>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.institution_id == Some(institution_id))
            .cloned()
            .collect())
    }
}

/// In-memory parent profile repository.
#[derive(Default)]
pub struct InMemoryParentProfiles {
    rows: Mutex<Vec<ParentProfile>>,
    links: Mutex<HashSet<(ParentId, StudentId)>>,
}

#[async_trait]
impl ParentProfileRepository for InMemoryParentProfiles {
    async fn insert(&self, profile: &ParentProfile) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.user_id == profile.user_id) {
            return Err(AppError::Conflict(
                "user already owns a parent profile".to_owned(),
            ));
        }
        rows.push(profile.clone());
        Ok(())
    }

    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<ParentProfile>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.user_id == user_id)
            .cloned())
    }

    async fn add_student_link(&self, parent_id: ParentId, student_id: StudentId) -> AppResult<()> {
        self.links.lock().await.insert((parent_id, student_id));
        Ok(())
    }

    async fn list_student_ids(&self, parent_id: ParentId) -> AppResult<Vec<StudentId>> {
        Ok(self
            .links
            .lock()
            .await
            .iter()
            .filter(|(linked_parent, _)| *linked_parent == parent_id)
            .map(|(_, student)| *student)
            .collect())
    }
}

/// In-memory assignment repository.
#[derive(Default)]
pub struct InMemoryAssignments {
    rows: Mutex<Vec<TeacherStudentAssignment>>,
}

impl InMemoryAssignments {
    /// Returns the number of stored assignments.
    pub async fn count(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignments {
    async fn create_if_absent(&self, assignment: &TeacherStudentAssignment) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        let exists = rows.iter().any(|row| {
            row.teacher_id == assignment.teacher_id
                && row.student_id == assignment.student_id
                && row.subject == assignment.subject
        });
        if exists {
            return Ok(false);
        }
        rows.push(assignment.clone());
        Ok(true)
    }

    async fn update(
        &self,
        assignment: &TeacherStudentAssignment,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == assignment.id)
            .ok_or_else(|| AppError::NotFound(format!("assignment {}", assignment.id)))?;
        if row.version != expected_version {
            return Err(stale("assignment"));
        }
        let mut updated = assignment.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find_by_id(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<TeacherStudentAssignment>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == assignment_id)
            .cloned())
    }

    async fn list_for_teacher(
        &self,
        teacher_id: TeacherId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.teacher_id == teacher_id && (include_ended || row.is_active))
            .cloned()
            .collect())
    }

    async fn list_for_student(
        &self,
        student_id: StudentId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.student_id == student_id && (include_ended || row.is_active))
            .cloned()
            .collect())
    }
}

/// In-memory goal repository.
#[derive(Default)]
pub struct InMemoryGoals {
    rows: Mutex<Vec<AcademicGoal>>,
}

#[async_trait]
impl GoalRepository for InMemoryGoals {
    async fn insert(&self, goal: &AcademicGoal) -> AppResult<()> {
        self.rows.lock().await.push(goal.clone());
        Ok(())
    }

    async fn update(&self, goal: &AcademicGoal, expected_version: Version) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == goal.id)
            .ok_or_else(|| AppError::NotFound(format!("goal {}", goal.id)))?;
        if row.version != expected_version {
            return Err(stale("goal"));
        }
        let mut updated = goal.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find_by_id(&self, goal_id: GoalId) -> AppResult<Option<AcademicGoal>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == goal_id)
            .cloned())
    }

    async fn list_for_student(&self, student_id: StudentId) -> AppResult<Vec<AcademicGoal>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.student_id == student_id)
            .cloned()
            .collect())
    }
}

/// In-memory invitation repository enforcing the pending-duplicate guard.
#[derive(Default)]
pub struct InMemoryInvitations {
    rows: Mutex<Vec<Invitation>>,
}

impl InMemoryInvitations {
    /// Returns a stored invitation by id.
    pub async fn stored(&self, invitation_id: InvitationId) -> Option<Invitation> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == invitation_id)
            .cloned()
    }
}

#[async_trait]
impl InvitationRepository for InMemoryInvitations {
    async fn insert(&self, invitation: &Invitation) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        let duplicate = rows.iter().any(|row| {
            row.status == InvitationStatus::Pending
                && row.invitee_email == invitation.invitee_email
                && row.target == invitation.target
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "a pending invitation for '{}' already exists",
                invitation.invitee_email.as_str()
            )));
        }
        rows.push(invitation.clone());
        Ok(())
    }

    async fn update(
        &self,
        invitation: &Invitation,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == invitation.id)
            .ok_or_else(|| AppError::NotFound(format!("invitation {}", invitation.id)))?;
        if row.version != expected_version {
            return Err(stale("invitation"));
        }
        let mut updated = invitation.clone();
        updated.version = expected_version.next();
        let new_version = updated.version;
        *row = updated;
        Ok(new_version)
    }

    async fn find_by_id(&self, invitation_id: InvitationId) -> AppResult<Option<Invitation>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == invitation_id)
            .cloned())
    }

    async fn find_pending_by_email(&self, email: &str) -> AppResult<Vec<Invitation>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| {
                row.status == InvitationStatus::Pending && row.invitee_email.as_str() == email
            })
            .cloned()
            .collect())
    }

    async fn list_for_email(&self, email: &str) -> AppResult<Vec<Invitation>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.invitee_email.as_str() == email)
            .cloned()
            .collect())
    }
}

/// In-memory acceptance unit applying the invitation update and the
/// relationship mutation against the shared fakes, mirroring the
/// single-transaction contract of the PostgreSQL implementation.
pub struct InMemoryAcceptanceUnit {
    /// Invitation store shared with the service under test.
    pub invitations: Arc<InMemoryInvitations>,
    /// Assignment store shared with the service under test.
    pub assignments: Arc<InMemoryAssignments>,
    /// Teacher profile store shared with the service under test.
    pub teacher_profiles: Arc<InMemoryTeacherProfiles>,
    /// Student profile store shared with the service under test.
    pub student_profiles: Arc<InMemoryStudentProfiles>,
}

#[async_trait]
impl AcceptanceUnitOfWork for InMemoryAcceptanceUnit {
    async fn commit(
        &self,
        invitation: &Invitation,
        expected_version: Version,
        mutation: AcceptanceMutation,
    ) -> AppResult<()> {
        self.invitations.update(invitation, expected_version).await?;
        match mutation {
            AcceptanceMutation::CreateAssignment(assignment) => {
                self.assignments.create_if_absent(&assignment).await?;
            }
            AcceptanceMutation::AffiliateTeacher {
                profile,
                expected_version,
            } => {
                self.teacher_profiles.update(&profile, expected_version).await?;
            }
            AcceptanceMutation::AffiliateStudent {
                profile,
                expected_version,
            } => {
                self.student_profiles.update(&profile, expected_version).await?;
            }
        }
        Ok(())
    }
}

/// In-memory refresh token repository.
#[derive(Default)]
pub struct InMemoryRefreshTokens {
    rows: Mutex<Vec<RefreshToken>>,
}

impl InMemoryRefreshTokens {
    /// Returns a stored token by digest.
    pub async fn stored(&self, digest: &str) -> Option<RefreshToken> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|row| row.token_digest == digest)
            .cloned()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokens {
    async fn insert(&self, token: &RefreshToken) -> AppResult<()> {
        self.rows.lock().await.push(token.clone());
        Ok(())
    }

    async fn find_by_digest(&self, digest: &str) -> AppResult<Option<RefreshToken>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.token_digest == digest)
            .cloned())
    }

    async fn store_revocation(&self, token: &RefreshToken) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == token.id)
            .ok_or_else(|| AppError::NotFound("refresh token".to_owned()))?;
        if row.revoked_at.is_none() {
            row.revoked_at = token.revoked_at;
            row.revoked_by_ip = token.revoked_by_ip.clone();
            row.revoked_reason = token.revoked_reason.clone();
        }
        Ok(())
    }
}

/// Signer recording signed claim sets and returning opaque stand-ins.
#[derive(Default)]
pub struct RecordingSigner {
    signed: std::sync::Mutex<Vec<AccessTokenClaims>>,
}

impl RecordingSigner {
    /// Returns the claim sets signed so far.
    pub fn signed(&self) -> Vec<AccessTokenClaims> {
        self.signed
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }
}

impl AccessTokenSigner for RecordingSigner {
    fn sign(&self, claims: &AccessTokenClaims) -> AppResult<String> {
        let mut rows = self
            .signed
            .lock()
            .map_err(|_| AppError::Internal("signer lock poisoned".to_owned()))?;
        rows.push(claims.clone());
        Ok(format!("signed-token-{}", rows.len()))
    }

    fn verify(&self, token: &str) -> AppResult<AccessTokenClaims> {
        let rows = self
            .signed
            .lock()
            .map_err(|_| AppError::Internal("signer lock poisoned".to_owned()))?;
        rows.iter()
            .enumerate()
            .find(|(index, _)| format!("signed-token-{}", index + 1) == token)
            .map(|(_, claims)| claims.clone())
            .ok_or_else(|| AppError::Unauthorized("unknown token".to_owned()))
    }
}

/// In-memory settings store.
#[derive(Default)]
pub struct InMemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySettings {
    /// Seeds a setting value.
    pub async fn seed(&self, key: &str, value: &str) {
        self.values
            .lock()
            .await
            .insert(key.to_owned(), value.to_owned());
    }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values
            .lock()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
