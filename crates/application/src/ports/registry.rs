use async_trait::async_trait;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{Institution, InstitutionAdmin, InstitutionId, UserId};

/// Repository port for institutions.
#[async_trait]
pub trait InstitutionRepository: Send + Sync {
    /// Persists a new institution.
    async fn insert(&self, institution: &Institution) -> AppResult<()>;

    /// Persists institution mutations under an optimistic-concurrency check.
    async fn update(
        &self,
        institution: &Institution,
        expected_version: Version,
    ) -> AppResult<Version>;

    /// Finds an institution by its unique identifier.
    async fn find_by_id(&self, institution_id: InstitutionId) -> AppResult<Option<Institution>>;

    /// Counts currently active affiliated student profiles.
    async fn count_active_students(&self, institution_id: InstitutionId) -> AppResult<i64>;

    /// Counts currently active affiliated teacher profiles.
    async fn count_active_teachers(&self, institution_id: InstitutionId) -> AppResult<i64>;
}

/// Repository port for institution admin links.
#[async_trait]
pub trait InstitutionAdminRepository: Send + Sync {
    /// Persists a new admin link. Fails with `Conflict` when the
    /// `(user_id, institution_id)` pair already exists.
    async fn insert(&self, admin: &InstitutionAdmin) -> AppResult<()>;

    /// Persists admin-link mutations under an optimistic-concurrency check.
    async fn update(&self, admin: &InstitutionAdmin, expected_version: Version)
    -> AppResult<Version>;

    /// Finds the admin link for a user at an institution.
    async fn find(
        &self,
        user_id: UserId,
        institution_id: InstitutionId,
    ) -> AppResult<Option<InstitutionAdmin>>;

    /// Finds the admin link for a user, if they administer any institution.
    async fn find_for_user(&self, user_id: UserId) -> AppResult<Option<InstitutionAdmin>>;

    /// Lists admin links for an institution.
    async fn list_for_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<InstitutionAdmin>>;
}
