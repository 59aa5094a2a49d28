use async_trait::async_trait;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{
    AcademicGoal, AssignmentId, GoalId, InstitutionId, ParentId, ParentProfile, StudentId,
    StudentProfile, TeacherId, TeacherProfile, TeacherStudentAssignment, UserId,
};

/// Repository port for teacher profiles.
#[async_trait]
pub trait TeacherProfileRepository: Send + Sync {
    /// Persists a new profile. Fails with `Conflict` when the user already
    /// owns one.
    async fn insert(&self, profile: &TeacherProfile) -> AppResult<()>;

    /// Persists profile mutations under an optimistic-concurrency check.
    async fn update(&self, profile: &TeacherProfile, expected_version: Version)
    -> AppResult<Version>;

    /// Finds a profile by its unique identifier.
    async fn find_by_id(&self, teacher_id: TeacherId) -> AppResult<Option<TeacherProfile>>;

    /// Finds the profile owned by a user.
    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<TeacherProfile>>;

    /// Lists profiles affiliated with an institution.
    async fn list_by_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<TeacherProfile>>;
}

/// Repository port for student profiles.
#[async_trait]
pub trait StudentProfileRepository: Send + Sync {
    /// Persists a new profile. Fails with `Conflict` when the user already
    /// owns one.
    async fn insert(&self, profile: &StudentProfile) -> AppResult<()>;

    /// Persists profile mutations under an optimistic-concurrency check.
    async fn update(&self, profile: &StudentProfile, expected_version: Version)
    -> AppResult<Version>;

    /// Finds a profile by its unique identifier.
    async fn find_by_id(&self, student_id: StudentId) -> AppResult<Option<StudentProfile>>;

    /// Finds the profile owned by a user.
    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<StudentProfile>>;

    /// Lists profiles affiliated with an institution.
    async fn list_by_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<StudentProfile>>;
}

/// Repository port for parent profiles and parent-student links.
#[async_trait]
pub trait ParentProfileRepository: Send + Sync {
    /// Persists a new profile. Fails with `Conflict` when the user already
    /// owns one.
    async fn insert(&self, profile: &ParentProfile) -> AppResult<()>;

    /// Finds the profile owned by a user.
    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<ParentProfile>>;

    /// Links a parent to a student profile. Idempotent.
    async fn add_student_link(&self, parent_id: ParentId, student_id: StudentId) -> AppResult<()>;

    /// Lists the student profiles linked to a parent.
    async fn list_student_ids(&self, parent_id: ParentId) -> AppResult<Vec<StudentId>>;
}

/// Repository port for teacher-student assignments.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Persists an assignment unless the `(teacher, student, subject)`
    /// triple already exists. Returns `true` when a row was created,
    /// `false` for the silent duplicate no-op.
    async fn create_if_absent(&self, assignment: &TeacherStudentAssignment) -> AppResult<bool>;

    /// Persists assignment mutations under an optimistic-concurrency check.
    async fn update(
        &self,
        assignment: &TeacherStudentAssignment,
        expected_version: Version,
    ) -> AppResult<Version>;

    /// Finds an assignment by its unique identifier.
    async fn find_by_id(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<TeacherStudentAssignment>>;

    /// Lists assignments for a teacher; ended rows included on request.
    async fn list_for_teacher(
        &self,
        teacher_id: TeacherId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>>;

    /// Lists assignments for a student; ended rows included on request.
    async fn list_for_student(
        &self,
        student_id: StudentId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>>;
}

/// Repository port for academic goals.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    /// Persists a new goal.
    async fn insert(&self, goal: &AcademicGoal) -> AppResult<()>;

    /// Persists goal mutations under an optimistic-concurrency check.
    async fn update(&self, goal: &AcademicGoal, expected_version: Version) -> AppResult<Version>;

    /// Finds a goal by its unique identifier.
    async fn find_by_id(&self, goal_id: GoalId) -> AppResult<Option<AcademicGoal>>;

    /// Lists goals for a student.
    async fn list_for_student(&self, student_id: StudentId) -> AppResult<Vec<AcademicGoal>>;
}
