use async_trait::async_trait;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{
    Invitation, InvitationId, StudentProfile, TeacherProfile, TeacherStudentAssignment,
};

/// Repository port for invitations.
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Persists a new invitation. The store carries a partial unique index
    /// on `(invitee_email, kind, target)` over pending rows; a violation
    /// fails with `Conflict`.
    async fn insert(&self, invitation: &Invitation) -> AppResult<()>;

    /// Persists invitation mutations under an optimistic-concurrency check.
    async fn update(&self, invitation: &Invitation, expected_version: Version)
    -> AppResult<Version>;

    /// Finds an invitation by its unique identifier.
    async fn find_by_id(&self, invitation_id: InvitationId) -> AppResult<Option<Invitation>>;

    /// Lists invitations whose stored status is still pending for an email.
    async fn find_pending_by_email(&self, email: &str) -> AppResult<Vec<Invitation>>;

    /// Lists every invitation addressed to an email, any status.
    async fn list_for_email(&self, email: &str) -> AppResult<Vec<Invitation>>;
}

/// The relationship-graph mutation applied together with an acceptance.
#[derive(Debug, Clone)]
pub enum AcceptanceMutation {
    /// Create a teacher-student assignment (teacher invitations).
    CreateAssignment(TeacherStudentAssignment),
    /// Affiliate a teacher profile with the inviting institution.
    AffiliateTeacher {
        /// Profile with the affiliation already applied in memory.
        profile: TeacherProfile,
        /// Version the profile was loaded at.
        expected_version: Version,
    },
    /// Affiliate a student profile with the inviting institution.
    AffiliateStudent {
        /// Profile with the affiliation already applied in memory.
        profile: StudentProfile,
        /// Version the profile was loaded at.
        expected_version: Version,
    },
}

/// Transactional unit pairing an invitation acceptance with its
/// relationship mutation.
///
/// Accepting an invitation is not itself what forms the relationship: the
/// implementation must apply the accepted invitation row and the mutation in
/// one storage transaction, so an invitation can never end up accepted
/// without the relationship existing (or vice versa).
#[async_trait]
pub trait AcceptanceUnitOfWork: Send + Sync {
    /// Commits the accepted invitation and the mutation atomically.
    async fn commit(
        &self,
        invitation: &Invitation,
        expected_version: Version,
        mutation: AcceptanceMutation,
    ) -> AppResult<()>;
}
