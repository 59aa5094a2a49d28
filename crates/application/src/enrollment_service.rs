//! Relationship graph: profiles, institution affiliations, teacher-student
//! assignments and academic goals.

use std::sync::Arc;

use chrono::Utc;

use scolaris_core::{AppError, AppResult};
use scolaris_domain::{
    AcademicGoal, AssignmentId, GoalId, Institution, InstitutionId, ParentProfile, StudentId,
    StudentProfile, TeacherId, TeacherProfile, TeacherStudentAssignment, UserId,
};

use crate::ports::enrollment::{
    AssignmentRepository, GoalRepository, ParentProfileRepository, StudentProfileRepository,
    TeacherProfileRepository,
};
use crate::ports::registry::InstitutionRepository;


/// Application service for the relationship graph.
#[derive(Clone)]
pub struct EnrollmentService {
    teacher_profiles: Arc<dyn TeacherProfileRepository>,
    student_profiles: Arc<dyn StudentProfileRepository>,
    parent_profiles: Arc<dyn ParentProfileRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    goals: Arc<dyn GoalRepository>,
    institutions: Arc<dyn InstitutionRepository>,
}

impl EnrollmentService {
    /// Creates a new enrollment service.
    #[must_use]
    pub fn new(
        teacher_profiles: Arc<dyn TeacherProfileRepository>,
        student_profiles: Arc<dyn StudentProfileRepository>,
        parent_profiles: Arc<dyn ParentProfileRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        goals: Arc<dyn GoalRepository>,
        institutions: Arc<dyn InstitutionRepository>,
    ) -> Self {
        Self {
            teacher_profiles,
            student_profiles,
            parent_profiles,
            assignments,
            goals,
            institutions,
        }
    }

    /// Creates an independent teacher profile for a user.
    ///
    /// A user owns at most one profile across all three flavors.
    pub async fn create_teacher_profile(
        &self,
        user_id: UserId,
        specialization: Option<String>,
    ) -> AppResult<TeacherProfile> {
        self.ensure_no_profile(user_id).await?;

        let profile = TeacherProfile::new(user_id, specialization, Utc::now());
        self.teacher_profiles.insert(&profile).await?;
        Ok(profile)
    }

    /// Creates a student profile for a user, optionally affiliated with an
    /// institution (capacity-checked).
    pub async fn create_student_profile(
        &self,
        user_id: UserId,
        institution_id: Option<InstitutionId>,
    ) -> AppResult<StudentProfile> {
        self.ensure_no_profile(user_id).await?;

        if let Some(institution_id) = institution_id {
            let institution = self.require_institution(institution_id).await?;
            self.ensure_student_capacity(&institution).await?;
        }

        let profile = StudentProfile::new(user_id, institution_id, Utc::now());
        self.student_profiles.insert(&profile).await?;
        Ok(profile)
    }

    /// Creates a parent profile for a user.
    pub async fn create_parent_profile(&self, user_id: UserId) -> AppResult<ParentProfile> {
        self.ensure_no_profile(user_id).await?;

        let profile = ParentProfile::new(user_id, Utc::now());
        self.parent_profiles.insert(&profile).await?;
        Ok(profile)
    }

    /// Links a parent profile to a student profile. Idempotent.
    pub async fn link_parent_student(
        &self,
        parent_user_id: UserId,
        student_id: StudentId,
    ) -> AppResult<()> {
        let parent = self
            .parent_profiles
            .find_by_user(parent_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("user '{parent_user_id}' owns no parent profile"))
            })?;

        self.student_profiles
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("student profile {student_id} not found")))?;

        self.parent_profiles
            .add_student_link(parent.id, student_id)
            .await
    }

    /// Affiliates a teacher with an institution, clearing independence.
    /// Capacity-checked before the write.
    pub async fn assign_teacher_to_institution(
        &self,
        teacher_id: TeacherId,
        institution_id: InstitutionId,
    ) -> AppResult<TeacherProfile> {
        let institution = self.require_institution(institution_id).await?;
        self.ensure_teacher_capacity(&institution).await?;

        let mut profile = self.require_teacher(teacher_id).await?;
        let expected_version = profile.version;

        profile.assign_to_institution(institution_id);
        profile.version = self
            .teacher_profiles
            .update(&profile, expected_version)
            .await?;
        Ok(profile)
    }

    /// Removes a teacher's institution affiliation; the teacher becomes
    /// independent again.
    pub async fn remove_teacher_from_institution(
        &self,
        teacher_id: TeacherId,
    ) -> AppResult<TeacherProfile> {
        let mut profile = self.require_teacher(teacher_id).await?;
        let expected_version = profile.version;

        profile.remove_from_institution();
        profile.version = self
            .teacher_profiles
            .update(&profile, expected_version)
            .await?;
        Ok(profile)
    }

    /// Removes a student's institution affiliation.
    pub async fn remove_student_from_institution(
        &self,
        student_id: StudentId,
    ) -> AppResult<StudentProfile> {
        let mut profile = self.require_student(student_id).await?;
        let expected_version = profile.version;

        profile.remove_from_institution();
        profile.version = self
            .student_profiles
            .update(&profile, expected_version)
            .await?;
        Ok(profile)
    }

    /// Creates a teacher-student assignment for a subject.
    ///
    /// Idempotent per `(teacher, student, subject)`: a duplicate create is
    /// a silent no-op. Returns whether a new pairing was formed.
    pub async fn create_assignment(
        &self,
        teacher_id: TeacherId,
        student_id: StudentId,
        subject: &str,
    ) -> AppResult<bool> {
        self.require_teacher(teacher_id).await?;
        self.require_student(student_id).await?;

        let assignment =
            TeacherStudentAssignment::new(teacher_id, student_id, subject, Utc::now())?;
        let created = self.assignments.create_if_absent(&assignment).await?;
        if created {
            tracing::info!(
                teacher = %teacher_id,
                student = %student_id,
                subject,
                "created assignment"
            );
        }
        Ok(created)
    }

    /// Ends an assignment, keeping the row for history.
    pub async fn end_assignment(&self, assignment_id: AssignmentId) -> AppResult<()> {
        let mut assignment = self.require_assignment(assignment_id).await?;
        let expected_version = assignment.version;

        assignment.end(Utc::now());
        self.assignments
            .update(&assignment, expected_version)
            .await?;
        Ok(())
    }

    /// Reactivates an ended assignment, clearing its end date.
    pub async fn reactivate_assignment(&self, assignment_id: AssignmentId) -> AppResult<()> {
        let mut assignment = self.require_assignment(assignment_id).await?;
        let expected_version = assignment.version;

        assignment.reactivate();
        self.assignments
            .update(&assignment, expected_version)
            .await?;
        Ok(())
    }

    /// Lists assignments for a teacher.
    pub async fn assignments_for_teacher(
        &self,
        teacher_id: TeacherId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>> {
        self.assignments
            .list_for_teacher(teacher_id, include_ended)
            .await
    }

    /// Lists assignments for a student.
    pub async fn assignments_for_student(
        &self,
        student_id: StudentId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>> {
        self.assignments
            .list_for_student(student_id, include_ended)
            .await
    }

    /// Updates a student's education info (grade level 1-12).
    pub async fn update_education_info(
        &self,
        student_id: StudentId,
        grade_level: Option<i16>,
        school_name: Option<String>,
    ) -> AppResult<StudentProfile> {
        let mut profile = self.require_student(student_id).await?;
        let expected_version = profile.version;

        profile.update_education_info(grade_level, school_name)?;
        profile.version = self
            .student_profiles
            .update(&profile, expected_version)
            .await?;
        Ok(profile)
    }

    /// Creates an academic goal for a student.
    pub async fn create_goal(
        &self,
        student_id: StudentId,
        title: &str,
        description: Option<String>,
    ) -> AppResult<AcademicGoal> {
        self.require_student(student_id).await?;

        let goal = AcademicGoal::new(student_id, title, description, Utc::now())?;
        self.goals.insert(&goal).await?;
        Ok(goal)
    }

    /// Updates a goal's progress (0-100); 100 completes the goal and
    /// regressing below 100 re-opens it.
    pub async fn update_goal_progress(
        &self,
        goal_id: GoalId,
        progress: i16,
    ) -> AppResult<AcademicGoal> {
        let mut goal = self
            .goals
            .find_by_id(goal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal {goal_id} not found")))?;
        let expected_version = goal.version;

        goal.update_progress(progress, Utc::now())?;
        goal.version = self.goals.update(&goal, expected_version).await?;
        Ok(goal)
    }

    /// Returns the teacher profile owned by a user, failing with
    /// `NotFound` when absent.
    pub async fn require_teacher_by_user(&self, user_id: UserId) -> AppResult<TeacherProfile> {
        self.teacher_profiles
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("user '{user_id}' owns no teacher profile"))
            })
    }

    /// Returns the student profile owned by a user, failing with
    /// `NotFound` when absent.
    pub async fn require_student_by_user(&self, user_id: UserId) -> AppResult<StudentProfile> {
        self.student_profiles
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("user '{user_id}' owns no student profile"))
            })
    }

    /// Returns a teacher profile by id, failing with `NotFound` when
    /// absent.
    pub async fn teacher(&self, teacher_id: TeacherId) -> AppResult<TeacherProfile> {
        self.require_teacher(teacher_id).await
    }

    /// Returns a student profile by id, failing with `NotFound` when
    /// absent.
    pub async fn student(&self, student_id: StudentId) -> AppResult<StudentProfile> {
        self.require_student(student_id).await
    }

    async fn require_teacher(&self, teacher_id: TeacherId) -> AppResult<TeacherProfile> {
        self.teacher_profiles
            .find_by_id(teacher_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("teacher profile {teacher_id} not found")))
    }

    async fn require_student(&self, student_id: StudentId) -> AppResult<StudentProfile> {
        self.student_profiles
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("student profile {student_id} not found")))
    }

    async fn require_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<TeacherStudentAssignment> {
        self.assignments
            .find_by_id(assignment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id} not found")))
    }

    async fn require_institution(&self, institution_id: InstitutionId) -> AppResult<Institution> {
        self.institutions
            .find_by_id(institution_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("institution {institution_id} not found")))
    }

    async fn ensure_teacher_capacity(&self, institution: &Institution) -> AppResult<()> {
        let active = self.institutions.count_active_teachers(institution.id).await?;
        if institution.can_add_teacher(active) {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "institution '{}' has reached its teacher capacity of {}",
            institution.id, institution.limits.max_teachers
        )))
    }

    async fn ensure_student_capacity(&self, institution: &Institution) -> AppResult<()> {
        let active = self.institutions.count_active_students(institution.id).await?;
        if institution.can_add_student(active) {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "institution '{}' has reached its student capacity of {}",
            institution.id, institution.limits.max_students
        )))
    }

    async fn ensure_no_profile(&self, user_id: UserId) -> AppResult<()> {
        if self.teacher_profiles.find_by_user(user_id).await?.is_some()
            || self.student_profiles.find_by_user(user_id).await?.is_some()
            || self.parent_profiles.find_by_user(user_id).await?.is_some()
        {
            return Err(AppError::Conflict(format!(
                "user '{user_id}' already owns a profile"
            )));
        }

        Ok(())
    }
}
