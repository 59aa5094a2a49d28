//! Institution registry and capacity control.
//!
//! Owns institution registration, license upgrades, admin links and the
//! admin-side creation of affiliated staff accounts. Capacity checks run
//! here, before the affiliation write: the write itself does not re-check,
//! so concurrent callers own that race.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use scolaris_core::{AppError, AppResult};
use scolaris_domain::{
    AdminTier, CapacityLimits, Institution, InstitutionAdmin, InstitutionId, InstitutionKind,
    LicenseTier, StudentProfile, TeacherProfile, User, UserId,
};

use crate::ports::enrollment::{StudentProfileRepository, TeacherProfileRepository};
use crate::ports::registry::{InstitutionAdminRepository, InstitutionRepository};
use crate::user_service::UserService;


/// Result of an admin-side staff account creation.
#[derive(Debug, Clone)]
pub struct CreatedStaffAccount {
    /// Created user account.
    pub user_id: UserId,
    /// Plaintext temporary password to hand to the new staff member.
    pub temporary_password: String,
}

/// Application service for the institution registry.
#[derive(Clone)]
pub struct InstitutionService {
    institution_repository: Arc<dyn InstitutionRepository>,
    admin_repository: Arc<dyn InstitutionAdminRepository>,
    teacher_profiles: Arc<dyn TeacherProfileRepository>,
    student_profiles: Arc<dyn StudentProfileRepository>,
    user_service: UserService,
}

impl InstitutionService {
    /// Creates a new institution service.
    #[must_use]
    pub fn new(
        institution_repository: Arc<dyn InstitutionRepository>,
        admin_repository: Arc<dyn InstitutionAdminRepository>,
        teacher_profiles: Arc<dyn TeacherProfileRepository>,
        student_profiles: Arc<dyn StudentProfileRepository>,
        user_service: UserService,
    ) -> Self {
        Self {
            institution_repository,
            admin_repository,
            teacher_profiles,
            student_profiles,
            user_service,
        }
    }

    /// Registers an institution together with its owner account.
    ///
    /// The owner registers as a regular user, the institution starts on a
    /// 14-day trial, and the owner receives an `Owner` admin link.
    pub async fn register_institution(
        &self,
        name: &str,
        kind: InstitutionKind,
        owner_email: &str,
        owner_password: &str,
        owner_display_name: &str,
    ) -> AppResult<(User, Institution)> {
        let owner = self
            .user_service
            .register(owner_email, owner_password, owner_display_name)
            .await?;

        let institution = Institution::register(name, kind, Utc::now())?;
        self.institution_repository.insert(&institution).await?;

        let admin = InstitutionAdmin::new(owner.id, institution.id, AdminTier::Owner);
        self.admin_repository.insert(&admin).await?;

        tracing::info!(
            institution = %institution.id,
            kind = kind.as_str(),
            "registered institution"
        );
        Ok((owner, institution))
    }

    /// Returns an institution, failing with `NotFound` when absent.
    pub async fn require_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Institution> {
        self.institution_repository
            .find_by_id(institution_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("institution {institution_id} not found")))
    }

    /// Ensures the user holds an active admin link for the institution.
    pub async fn require_admin(
        &self,
        user_id: UserId,
        institution_id: InstitutionId,
    ) -> AppResult<InstitutionAdmin> {
        let admin = self
            .admin_repository
            .find(user_id, institution_id)
            .await?
            .filter(|admin| admin.is_active);

        admin.ok_or_else(|| {
            AppError::Forbidden(format!(
                "user '{user_id}' does not administer institution '{institution_id}'"
            ))
        })
    }

    /// Ensures the institution's subscription window covers now.
    ///
    /// Institution-scoped writes (staff creation, invitations) are blocked
    /// on an expired subscription; reads never are.
    pub fn ensure_subscription_active(&self, institution: &Institution) -> AppResult<()> {
        if institution.is_subscription_active(Utc::now()) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "subscription for institution '{}' has expired",
            institution.id
        )))
    }

    /// Ensures another active teacher fits under the capacity limit.
    pub async fn ensure_teacher_capacity(&self, institution: &Institution) -> AppResult<()> {
        let active = self
            .institution_repository
            .count_active_teachers(institution.id)
            .await?;
        if institution.can_add_teacher(active) {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "institution '{}' has reached its teacher capacity of {}",
            institution.id, institution.limits.max_teachers
        )))
    }

    /// Ensures another active student fits under the capacity limit.
    pub async fn ensure_student_capacity(&self, institution: &Institution) -> AppResult<()> {
        let active = self
            .institution_repository
            .count_active_students(institution.id)
            .await?;
        if institution.can_add_student(active) {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "institution '{}' has reached its student capacity of {}",
            institution.id, institution.limits.max_students
        )))
    }

    /// Creates an affiliated teacher account on behalf of an institution
    /// admin. Returns the new user id and its temporary password.
    pub async fn create_teacher_account(
        &self,
        acting_admin: UserId,
        institution_id: InstitutionId,
        email: &str,
        display_name: &str,
        specialization: Option<String>,
    ) -> AppResult<CreatedStaffAccount> {
        self.require_admin(acting_admin, institution_id).await?;
        let institution = self.require_institution(institution_id).await?;
        self.ensure_subscription_active(&institution)?;
        self.ensure_teacher_capacity(&institution).await?;

        let (user, temporary_password) = self
            .user_service
            .register_with_temporary_password(email, display_name)
            .await?;

        let mut profile = TeacherProfile::new(user.id, specialization, Utc::now());
        profile.assign_to_institution(institution_id);
        self.teacher_profiles.insert(&profile).await?;

        Ok(CreatedStaffAccount {
            user_id: user.id,
            temporary_password,
        })
    }

    /// Creates an affiliated student account on behalf of an institution
    /// admin. Returns the new user id and its temporary password.
    pub async fn create_student_account(
        &self,
        acting_admin: UserId,
        institution_id: InstitutionId,
        email: &str,
        display_name: &str,
        grade_level: Option<i16>,
    ) -> AppResult<CreatedStaffAccount> {
        self.require_admin(acting_admin, institution_id).await?;
        let institution = self.require_institution(institution_id).await?;
        self.ensure_subscription_active(&institution)?;
        self.ensure_student_capacity(&institution).await?;

        let (user, temporary_password) = self
            .user_service
            .register_with_temporary_password(email, display_name)
            .await?;

        let mut profile = StudentProfile::new(user.id, Some(institution_id), Utc::now());
        profile.update_education_info(grade_level, None)?;
        self.student_profiles.insert(&profile).await?;

        Ok(CreatedStaffAccount {
            user_id: user.id,
            temporary_password,
        })
    }

    /// Replaces tier, limits and subscription end date atomically, under
    /// the institution's optimistic-concurrency check.
    pub async fn upgrade_license(
        &self,
        acting_admin: UserId,
        institution_id: InstitutionId,
        tier: LicenseTier,
        limits: CapacityLimits,
        subscription_ends_at: Option<DateTime<Utc>>,
    ) -> AppResult<Institution> {
        let admin = self.require_admin(acting_admin, institution_id).await?;
        if admin.tier != AdminTier::Owner {
            return Err(AppError::Forbidden(
                "only the institution owner can change the license".to_owned(),
            ));
        }

        let mut institution = self.require_institution(institution_id).await?;
        let expected_version = institution.version;

        institution.upgrade_license(tier, limits, subscription_ends_at)?;
        institution.version = self
            .institution_repository
            .update(&institution, expected_version)
            .await?;

        tracing::info!(
            institution = %institution.id,
            tier = tier.as_str(),
            "upgraded license"
        );
        Ok(institution)
    }
}
