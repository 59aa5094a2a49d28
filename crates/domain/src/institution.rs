//! Institution registry: license tiers, capacity limits, subscriptions.

use chrono::{DateTime, Duration, Utc};
use scolaris_core::{AppError, AppResult, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// Length of the trial subscription window granted on registration.
pub const TRIAL_PERIOD_DAYS: i64 = 14;

/// Unique identifier for an institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstitutionId(Uuid);

impl InstitutionId {
    /// Creates a new random institution identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an institution identifier from an existing UUID value.
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

impl Default for InstitutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstitutionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Kind of institution, which determines the default capacity limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionKind {
    /// A school with many students and a sizeable teaching staff.
    School,
    /// A private course run by a handful of teachers.
    PrivateCourse,
    /// A small study/tutoring center.
    StudyCenter,
    /// An online platform with a large student body and few staff.
    OnlinePlatform,
}

impl InstitutionKind {
    /// Returns the storage string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::School => "school",
            Self::PrivateCourse => "private_course",
            Self::StudyCenter => "study_center",
            Self::OnlinePlatform => "online_platform",
        }
    }

    /// Parses a storage string into an institution kind.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "school" => Ok(Self::School),
            "private_course" => Ok(Self::PrivateCourse),
            "study_center" => Ok(Self::StudyCenter),
            "online_platform" => Ok(Self::OnlinePlatform),
            _ => Err(AppError::Validation(format!(
                "unknown institution kind '{value}'"
            ))),
        }
    }
}

/// License tier attached to an institution subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseTier {
    /// 14-day evaluation license granted on registration.
    Trial,
    /// Entry paid tier.
    Basic,
    /// Full paid tier.
    Premium,
}

impl LicenseTier {
    /// Returns the storage string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }

    /// Parses a storage string into a license tier.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "trial" => Ok(Self::Trial),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            _ => Err(AppError::Validation(format!(
                "unknown license tier '{value}'"
            ))),
        }
    }
}

/// Ceiling on active teacher/student affiliations for one institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLimits {
    /// Maximum number of simultaneously active affiliated students.
    pub max_students: i32,
    /// Maximum number of simultaneously active affiliated teachers.
    pub max_teachers: i32,
}

impl CapacityLimits {
    /// Returns the default limits for an institution kind.
    ///
    /// School 500/50, PrivateCourse 200/20, StudyCenter 50/5,
    /// OnlinePlatform 1000/10.
    #[must_use]
    pub fn for_kind(kind: InstitutionKind) -> Self {
        match kind {
            InstitutionKind::School => Self {
                max_students: 500,
                max_teachers: 50,
            },
            InstitutionKind::PrivateCourse => Self {
                max_students: 200,
                max_teachers: 20,
            },
            InstitutionKind::StudyCenter => Self {
                max_students: 50,
                max_teachers: 5,
            },
            InstitutionKind::OnlinePlatform => Self {
                max_students: 1000,
                max_teachers: 10,
            },
        }
    }

    /// Fallback limits when no kind-specific entry applies.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            max_students: 50,
            max_teachers: 5,
        }
    }
}

/// An institution aggregate.
///
/// Teacher and student affiliations are foreign-key references held by the
/// profiles themselves; the institution only owns its limits and
/// subscription window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    /// Unique identifier.
    pub id: InstitutionId,
    /// Display name.
    pub name: String,
    /// Institution kind.
    pub kind: InstitutionKind,
    /// Current license tier.
    pub license: LicenseTier,
    /// Capacity limits derived from kind at registration, replaced on
    /// license upgrade.
    pub limits: CapacityLimits,
    /// Start of the current subscription window.
    pub subscription_started_at: DateTime<Utc>,
    /// End of the current subscription window; `None` means open-ended.
    pub subscription_ends_at: Option<DateTime<Utc>>,
    /// Whether the institution is active.
    pub is_active: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl Institution {
    /// Registers a new institution with a 14-day trial subscription and
    /// capacity limits derived from its kind.
    pub fn register(
        name: impl Into<String>,
        kind: InstitutionKind,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "institution name must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id: InstitutionId::new(),
            name,
            kind,
            license: LicenseTier::Trial,
            limits: CapacityLimits::for_kind(kind),
            subscription_started_at: now,
            subscription_ends_at: Some(now + Duration::days(TRIAL_PERIOD_DAYS)),
            is_active: true,
            created_at: now,
            version: Version::initial(),
        })
    }

    /// Returns whether another active student affiliation fits under the
    /// current limit.
    ///
    /// Callers must run this check before creating an affiliation; the
    /// assignment write itself does not re-check, so concurrent callers own
    /// the race.
    #[must_use]
    pub fn can_add_student(&self, active_student_count: i64) -> bool {
        active_student_count < i64::from(self.limits.max_students)
    }

    /// Returns whether another active teacher affiliation fits under the
    /// current limit.
    #[must_use]
    pub fn can_add_teacher(&self, active_teacher_count: i64) -> bool {
        active_teacher_count < i64::from(self.limits.max_teachers)
    }

    /// Replaces tier, limits and subscription end date in one step.
    pub fn upgrade_license(
        &mut self,
        tier: LicenseTier,
        limits: CapacityLimits,
        subscription_ends_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        if limits.max_students <= 0 || limits.max_teachers <= 0 {
            return Err(AppError::Validation(
                "capacity limits must be positive".to_owned(),
            ));
        }

        self.license = tier;
        self.limits = limits;
        self.subscription_ends_at = subscription_ends_at;
        Ok(())
    }

    /// Returns whether the subscription window covers `now`.
    ///
    /// Pure read with no side effect; write-blocking on expired
    /// subscriptions is the caller's decision.
    #[must_use]
    pub fn is_subscription_active(&self, now: DateTime<Utc>) -> bool {
        match self.subscription_ends_at {
            None => true,
            Some(ends_at) => ends_at > now,
        }
    }
}

/// Administrative tier of an institution admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminTier {
    /// Full control, including license management.
    Owner,
    /// Day-to-day staff and student management.
    Manager,
}

impl AdminTier {
    /// Returns the storage string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
        }
    }

    /// Parses a storage string into an admin tier.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            _ => Err(AppError::Validation(format!("unknown admin tier '{value}'"))),
        }
    }
}

/// Link between a user and an institution they administer.
///
/// The `(user_id, institution_id)` pair is unique in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionAdmin {
    /// Administrating user.
    pub user_id: UserId,
    /// Administered institution.
    pub institution_id: InstitutionId,
    /// Administrative tier.
    pub tier: AdminTier,
    /// Whether the admin link is active.
    pub is_active: bool,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl InstitutionAdmin {
    /// Creates an active admin link.
    #[must_use]
    pub fn new(user_id: UserId, institution_id: InstitutionId, tier: AdminTier) -> Self {
        Self {
            user_id,
            institution_id,
            tier,
            is_active: true,
            version: Version::initial(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn school_gets_500_students_50_teachers() {
        let now = Utc::now();
        let institution = Institution::register("Northgate School", InstitutionKind::School, now)
            .unwrap_or_else(|_| panic!("test institution"));

        assert_eq!(institution.limits.max_students, 500);
        assert_eq!(institution.limits.max_teachers, 50);
        assert_eq!(institution.license, LicenseTier::Trial);
        assert_eq!(
            institution.subscription_ends_at,
            Some(now + Duration::days(TRIAL_PERIOD_DAYS))
        );
    }

    #[test]
    fn online_platform_gets_1000_students_10_teachers() {
        let limits = CapacityLimits::for_kind(InstitutionKind::OnlinePlatform);
        assert_eq!(limits.max_students, 1000);
        assert_eq!(limits.max_teachers, 10);
    }

    #[test]
    fn can_add_student_is_false_at_capacity() {
        let institution = Institution::register("Corner Tutors", InstitutionKind::StudyCenter, Utc::now())
            .unwrap_or_else(|_| panic!("test institution"));

        assert!(institution.can_add_student(49));
        assert!(!institution.can_add_student(50));
        assert!(!institution.can_add_student(51));
    }

    #[test]
    fn upgrade_replaces_tier_limits_and_window() {
        let now = Utc::now();
        let mut institution = Institution::register("Corner Tutors", InstitutionKind::StudyCenter, now)
            .unwrap_or_else(|_| panic!("test institution"));

        let new_end = now + Duration::days(365);
        let result = institution.upgrade_license(
            LicenseTier::Premium,
            CapacityLimits {
                max_students: 300,
                max_teachers: 30,
            },
            Some(new_end),
        );

        assert!(result.is_ok());
        assert_eq!(institution.license, LicenseTier::Premium);
        assert_eq!(institution.limits.max_students, 300);
        assert_eq!(institution.subscription_ends_at, Some(new_end));
    }

    #[test]
    fn upgrade_rejects_non_positive_limits() {
        let mut institution = Institution::register("Corner Tutors", InstitutionKind::StudyCenter, Utc::now())
            .unwrap_or_else(|_| panic!("test institution"));

        let result = institution.upgrade_license(
            LicenseTier::Basic,
            CapacityLimits {
                max_students: 0,
                max_teachers: 5,
            },
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn subscription_active_is_a_pure_read() {
        let now = Utc::now();
        let mut institution = Institution::register("Northgate School", InstitutionKind::School, now)
            .unwrap_or_else(|_| panic!("test institution"));

        assert!(institution.is_subscription_active(now));
        assert!(!institution.is_subscription_active(now + Duration::days(TRIAL_PERIOD_DAYS)));

        institution.subscription_ends_at = None;
        assert!(institution.is_subscription_active(now + Duration::days(10_000)));
    }
}
