//! Invitation lifecycle state machine.
//!
//! An invitation bridges an email address into a concrete relationship:
//! `Pending -> Accepted`, `Pending -> Rejected`, `Pending -> Expired`. The
//! terminal states admit no further transition. Expiry is lazy: readers use
//! [`Invitation::is_pending`] against the wall clock, and only
//! [`Invitation::mark_expired`] durably flips the stored status.
//!
//! Accepting an invitation does not itself create the relationship; the
//! orchestrating service must pair the accept with the corresponding
//! relationship-graph mutation in one transaction.

use chrono::{DateTime, Duration, Utc};
use scolaris_core::{AppError, AppResult, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::institution::InstitutionId;
use crate::profile::TeacherId;
use crate::user::{EmailAddress, UserId};

/// Default invitation validity window.
pub const DEFAULT_INVITATION_EXPIRY_DAYS: i64 = 7;

/// Unique identifier for an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvitationId(Uuid);

impl InvitationId {
    /// Creates a new random invitation identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an invitation identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InvitationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvitationId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// What the invitee is being invited to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvitationTarget {
    /// Join an institution as staff or student.
    Institution {
        /// Target institution.
        institution_id: InstitutionId,
    },
    /// Become a student of an independent teacher.
    Teacher {
        /// Target teacher profile.
        teacher_id: TeacherId,
    },
}

impl InvitationTarget {
    /// Returns the kind discriminant for this target.
    #[must_use]
    pub fn kind(&self) -> InvitationKind {
        match self {
            Self::Institution { .. } => InvitationKind::Institution,
            Self::Teacher { .. } => InvitationKind::Teacher,
        }
    }
}

/// Invitation kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    /// Institution-issued invitation.
    Institution,
    /// Teacher-issued invitation.
    Teacher,
}

impl InvitationKind {
    /// Returns the storage string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Institution => "institution",
            Self::Teacher => "teacher",
        }
    }

    /// Parses a storage string into an invitation kind.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "institution" => Ok(Self::Institution),
            "teacher" => Ok(Self::Teacher),
            _ => Err(AppError::Validation(format!(
                "unknown invitation kind '{value}'"
            ))),
        }
    }
}

/// Lifecycle status of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Awaiting a response.
    Pending,
    /// Accepted by the invitee; terminal.
    Accepted,
    /// Rejected by the invitee; terminal.
    Rejected,
    /// Durably marked as expired; terminal.
    Expired,
}

impl InvitationStatus {
    /// Returns the storage string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Parses a storage string into a status.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown invitation status '{value}'"
            ))),
        }
    }
}

/// An invitation addressed to an email, resolving to a user on acceptance.
///
/// The entity does not guard against a second pending invitation to the same
/// email; callers query for existing pending invitations first, and the
/// store's partial unique index is the final guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Unique identifier.
    pub id: InvitationId,
    /// User who issued the invitation.
    pub inviter_id: UserId,
    /// Email the invitation is addressed to.
    pub invitee_email: EmailAddress,
    /// User who responded, set on acceptance.
    pub invitee_user_id: Option<UserId>,
    /// What the invitee is joining.
    pub target: InvitationTarget,
    /// Optional message shown to the invitee.
    pub message: Option<String>,
    /// Lifecycle status.
    pub status: InvitationStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Instant after which the invitation can no longer be accepted.
    pub expires_at: DateTime<Utc>,
    /// Instant of the accept/reject response, if any.
    pub responded_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl Invitation {
    /// Creates a pending invitation expiring after `expiration_days`
    /// (default 7 when `None`).
    pub fn create(
        inviter_id: UserId,
        invitee_email: EmailAddress,
        target: InvitationTarget,
        message: Option<String>,
        expiration_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let expiration_days = expiration_days.unwrap_or(DEFAULT_INVITATION_EXPIRY_DAYS);
        if expiration_days <= 0 {
            return Err(AppError::Validation(
                "invitation expiration days must be positive".to_owned(),
            ));
        }

        Ok(Self {
            id: InvitationId::new(),
            inviter_id,
            invitee_email,
            invitee_user_id: None,
            target,
            message,
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(expiration_days),
            responded_at: None,
            version: Version::initial(),
        })
    }

    /// Accepts the invitation on behalf of `invitee_user_id`.
    ///
    /// Valid only while pending and unexpired; otherwise fails with
    /// [`AppError::InvalidStateTransition`]. The caller pairs this with the
    /// relationship mutation in one transaction.
    pub fn accept(&mut self, invitee_user_id: UserId, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != InvitationStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "invitation {} is not pending",
                self.id
            )));
        }

        if now > self.expires_at {
            return Err(AppError::InvalidStateTransition(format!(
                "invitation {} expired at {}",
                self.id, self.expires_at
            )));
        }

        self.status = InvitationStatus::Accepted;
        self.invitee_user_id = Some(invitee_user_id);
        self.responded_at = Some(now);
        Ok(())
    }

    /// Rejects the invitation. Valid only while pending.
    pub fn reject(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != InvitationStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "invitation {} is not pending",
                self.id
            )));
        }

        self.status = InvitationStatus::Rejected;
        self.responded_at = Some(now);
        Ok(())
    }

    /// Quick pending check for readers: stored status is pending AND the
    /// expiry instant has not passed.
    #[must_use]
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && now <= self.expires_at
    }

    /// Durably flips a nominally pending, past-expiry invitation to
    /// `Expired`. The only path that writes the expired status.
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != InvitationStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "invitation {} is not pending",
                self.id
            )));
        }

        if now <= self.expires_at {
            return Err(AppError::InvalidStateTransition(format!(
                "invitation {} has not expired yet",
                self.id
            )));
        }

        self.status = InvitationStatus::Expired;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use scolaris_core::AppError;

    use super::*;

    fn pending_invitation(expiration_days: Option<i64>) -> Invitation {
        let email = EmailAddress::new("invitee@example.org").unwrap_or_else(|_| panic!("test"));
        Invitation::create(
            UserId::new(),
            email,
            InvitationTarget::Institution {
                institution_id: InstitutionId::new(),
            },
            Some("Join us".to_owned()),
            expiration_days,
            Utc::now(),
        )
        .unwrap_or_else(|_| panic!("test invitation"))
    }

    #[test]
    fn create_defaults_to_seven_day_expiry() {
        let invitation = pending_invitation(None);
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(
            invitation.expires_at,
            invitation.created_at + Duration::days(DEFAULT_INVITATION_EXPIRY_DAYS)
        );
    }

    #[test]
    fn accept_while_pending_and_unexpired() {
        let mut invitation = pending_invitation(None);
        let invitee = UserId::new();
        let now = Utc::now();

        assert!(invitation.accept(invitee, now).is_ok());
        assert_eq!(invitation.status, InvitationStatus::Accepted);
        assert_eq!(invitation.invitee_user_id, Some(invitee));
        assert_eq!(invitation.responded_at, Some(now));
    }

    #[test]
    fn accept_after_expiry_is_invalid() {
        let mut invitation = pending_invitation(Some(7));
        let late = invitation.created_at + Duration::days(8);

        let result = invitation.accept(UserId::new(), late);
        assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));
        assert_eq!(invitation.status, InvitationStatus::Pending);
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        let mut invitation = pending_invitation(None);
        invitation
            .reject(Utc::now())
            .unwrap_or_else(|_| panic!("test reject"));

        assert!(invitation.accept(UserId::new(), Utc::now()).is_err());
        assert!(invitation.reject(Utc::now()).is_err());
        assert!(invitation.mark_expired(Utc::now()).is_err());
    }

    #[test]
    fn expiry_is_lazy_until_marked() {
        let mut invitation = pending_invitation(Some(7));
        let late = invitation.created_at + Duration::days(8);

        // Reader-facing check flips before the stored status does.
        assert!(!invitation.is_pending(late));
        assert_eq!(invitation.status, InvitationStatus::Pending);

        assert!(invitation.mark_expired(late).is_ok());
        assert_eq!(invitation.status, InvitationStatus::Expired);
    }

    #[test]
    fn mark_expired_rejects_unexpired_invitation() {
        let mut invitation = pending_invitation(Some(7));
        let result = invitation.mark_expired(invitation.created_at + Duration::days(1));
        assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));
    }

    #[test]
    fn non_positive_expiration_is_rejected() {
        let email = EmailAddress::new("invitee@example.org").unwrap_or_else(|_| panic!("test"));
        let result = Invitation::create(
            UserId::new(),
            email,
            InvitationTarget::Teacher {
                teacher_id: TeacherId::new(),
            },
            None,
            Some(0),
            Utc::now(),
        );
        assert!(result.is_err());
    }
}
