//! Invitation workflow orchestration.
//!
//! Creates invitations (with the duplicate-pending guard and
//! subscription/capacity checks), lists them for the invitee, and drives
//! the accept/reject/expire transitions. Acceptance pairs the status change
//! with the relationship-graph mutation through [`AcceptanceUnitOfWork`],
//! so both commit or neither does.

use std::sync::Arc;

use chrono::Utc;

use scolaris_core::{AppError, AppResult};
use scolaris_domain::{
    EmailAddress, Institution, InstitutionId, Invitation, InvitationId, InvitationTarget,
    PlatformEvent, TeacherStudentAssignment, User, UserId,
};

use crate::ports::enrollment::{StudentProfileRepository, TeacherProfileRepository};
use crate::ports::identity::{EventPublisher, UserRepository};
use crate::ports::invitations::{AcceptanceMutation, AcceptanceUnitOfWork, InvitationRepository};
use crate::ports::registry::{InstitutionAdminRepository, InstitutionRepository};


/// Subject recorded when a teacher invitation carries no specialization.
const DEFAULT_ASSIGNMENT_SUBJECT: &str = "General";

/// Application service for the invitation workflow.
#[derive(Clone)]
pub struct InvitationService {
    invitations: Arc<dyn InvitationRepository>,
    acceptance: Arc<dyn AcceptanceUnitOfWork>,
    institutions: Arc<dyn InstitutionRepository>,
    admins: Arc<dyn InstitutionAdminRepository>,
    teacher_profiles: Arc<dyn TeacherProfileRepository>,
    student_profiles: Arc<dyn StudentProfileRepository>,
    users: Arc<dyn UserRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl InvitationService {
    /// Creates a new invitation service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invitations: Arc<dyn InvitationRepository>,
        acceptance: Arc<dyn AcceptanceUnitOfWork>,
        institutions: Arc<dyn InstitutionRepository>,
        admins: Arc<dyn InstitutionAdminRepository>,
        teacher_profiles: Arc<dyn TeacherProfileRepository>,
        student_profiles: Arc<dyn StudentProfileRepository>,
        users: Arc<dyn UserRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            invitations,
            acceptance,
            institutions,
            admins,
            teacher_profiles,
            student_profiles,
            users,
            event_publisher,
        }
    }

    /// Creates an institution invitation on behalf of an institution admin.
    pub async fn invite_to_institution(
        &self,
        inviter_id: UserId,
        institution_id: InstitutionId,
        invitee_email: &str,
        message: Option<String>,
        expiration_days: Option<i64>,
    ) -> AppResult<Invitation> {
        let admin = self
            .admins
            .find(inviter_id, institution_id)
            .await?
            .filter(|admin| admin.is_active);
        if admin.is_none() {
            return Err(AppError::Forbidden(format!(
                "user '{inviter_id}' does not administer institution '{institution_id}'"
            )));
        }

        let institution = self.require_institution(institution_id).await?;
        if !institution.is_subscription_active(Utc::now()) {
            return Err(AppError::Forbidden(format!(
                "subscription for institution '{}' has expired",
                institution.id
            )));
        }

        let target = InvitationTarget::Institution { institution_id };
        self.create_invitation(inviter_id, invitee_email, target, message, expiration_days)
            .await
    }

    /// Creates a teacher invitation; the inviter must own a teacher profile.
    pub async fn invite_student_to_teacher(
        &self,
        inviter_id: UserId,
        invitee_email: &str,
        message: Option<String>,
        expiration_days: Option<i64>,
    ) -> AppResult<Invitation> {
        let teacher = self
            .teacher_profiles
            .find_by_user(inviter_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden(format!("user '{inviter_id}' owns no teacher profile"))
            })?;

        let target = InvitationTarget::Teacher {
            teacher_id: teacher.id,
        };
        self.create_invitation(inviter_id, invitee_email, target, message, expiration_days)
            .await
    }

    /// Lists every invitation addressed to the user's email.
    pub async fn my_invitations(&self, user_id: UserId) -> AppResult<Vec<Invitation>> {
        let user = self.require_user(user_id).await?;
        self.invitations.list_for_email(user.email.as_str()).await
    }

    /// Accepts an invitation on behalf of the invitee.
    ///
    /// Validates the state machine, builds the relationship mutation for
    /// the target (with the capacity check for institution invitations)
    /// and commits both through the acceptance unit in one transaction.
    pub async fn accept(&self, invitation_id: InvitationId, user_id: UserId) -> AppResult<()> {
        let user = self.require_user(user_id).await?;
        let mut invitation = self.require_invitation(invitation_id).await?;
        self.ensure_addressed_to(&invitation, &user)?;

        let expected_version = invitation.version;
        invitation.accept(user_id, Utc::now())?;

        let mutation = self.build_mutation(&invitation, &user).await?;
        self.acceptance
            .commit(&invitation, expected_version, mutation)
            .await?;

        tracing::info!(invitation = %invitation.id, user = %user_id, "accepted invitation");
        Ok(())
    }

    /// Rejects an invitation on behalf of the invitee.
    pub async fn reject(&self, invitation_id: InvitationId, user_id: UserId) -> AppResult<()> {
        let user = self.require_user(user_id).await?;
        let mut invitation = self.require_invitation(invitation_id).await?;
        self.ensure_addressed_to(&invitation, &user)?;

        let expected_version = invitation.version;
        invitation.reject(Utc::now())?;
        self.invitations
            .update(&invitation, expected_version)
            .await?;
        Ok(())
    }

    /// Durably marks a past-expiry pending invitation as expired.
    pub async fn mark_expired(&self, invitation_id: InvitationId) -> AppResult<()> {
        let mut invitation = self.require_invitation(invitation_id).await?;

        let expected_version = invitation.version;
        invitation.mark_expired(Utc::now())?;
        self.invitations
            .update(&invitation, expected_version)
            .await?;
        Ok(())
    }

    async fn create_invitation(
        &self,
        inviter_id: UserId,
        invitee_email: &str,
        target: InvitationTarget,
        message: Option<String>,
        expiration_days: Option<i64>,
    ) -> AppResult<Invitation> {
        let email = EmailAddress::new(invitee_email)?;

        // First guard against duplicate pending invitations; the store's
        // partial unique index closes the remaining race window.
        let pending = self.invitations.find_pending_by_email(email.as_str()).await?;
        if pending.iter().any(|existing| existing.target == target) {
            return Err(AppError::Conflict(format!(
                "a pending invitation for '{}' already exists",
                email.as_str()
            )));
        }

        let inviter = self.require_user(inviter_id).await?;
        let invitation = Invitation::create(
            inviter_id,
            email,
            target,
            message.clone(),
            expiration_days,
            Utc::now(),
        )?;
        self.invitations.insert(&invitation).await?;

        self.event_publisher
            .publish(PlatformEvent::InvitationCreated {
                invitation_id: invitation.id,
                invitee_email: invitation.invitee_email.as_str().to_owned(),
                inviter_name: inviter.display_name.clone(),
                kind: invitation.target.kind(),
                message,
            })
            .await?;

        tracing::info!(invitation = %invitation.id, "created invitation");
        Ok(invitation)
    }

    async fn build_mutation(
        &self,
        invitation: &Invitation,
        invitee: &User,
    ) -> AppResult<AcceptanceMutation> {
        match invitation.target {
            InvitationTarget::Teacher { teacher_id } => {
                let teacher = self
                    .teacher_profiles
                    .find_by_id(teacher_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("teacher profile {teacher_id} not found"))
                    })?;

                let student = self
                    .student_profiles
                    .find_by_user(invitee.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Validation(
                            "accepting a teacher invitation requires a student profile".to_owned(),
                        )
                    })?;

                let subject = teacher
                    .specialization
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ASSIGNMENT_SUBJECT.to_owned());
                let assignment = TeacherStudentAssignment::new(
                    teacher.id,
                    student.id,
                    subject,
                    Utc::now(),
                )?;
                Ok(AcceptanceMutation::CreateAssignment(assignment))
            }
            InvitationTarget::Institution { institution_id } => {
                let institution = self.require_institution(institution_id).await?;

                // The invitee's profile flavor decides which affiliation
                // (and which capacity limit) applies.
                if let Some(mut teacher) = self.teacher_profiles.find_by_user(invitee.id).await? {
                    self.ensure_teacher_capacity(&institution).await?;
                    let expected_version = teacher.version;
                    teacher.assign_to_institution(institution_id);
                    return Ok(AcceptanceMutation::AffiliateTeacher {
                        profile: teacher,
                        expected_version,
                    });
                }

                if let Some(mut student) = self.student_profiles.find_by_user(invitee.id).await? {
                    self.ensure_student_capacity(&institution).await?;
                    let expected_version = student.version;
                    student.assign_to_institution(institution_id);
                    return Ok(AcceptanceMutation::AffiliateStudent {
                        profile: student,
                        expected_version,
                    });
                }

                Err(AppError::Validation(
                    "accepting an institution invitation requires a teacher or student profile"
                        .to_owned(),
                ))
            }
        }
    }

    fn ensure_addressed_to(&self, invitation: &Invitation, user: &User) -> AppResult<()> {
        if invitation.invitee_email == user.email {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "invitation {} is not addressed to this account",
            invitation.id
        )))
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

    async fn require_invitation(&self, invitation_id: InvitationId) -> AppResult<Invitation> {
        self.invitations
            .find_by_id(invitation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("invitation {invitation_id} not found")))
    }

    async fn require_institution(&self, institution_id: InstitutionId) -> AppResult<Institution> {
        self.institutions
            .find_by_id(institution_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("institution {institution_id} not found")))
    }

    async fn require_user(&self, user_id: UserId) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))
    }
}
