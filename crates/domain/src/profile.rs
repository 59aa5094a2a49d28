//! Teacher, student and parent profiles.
//!
//! Each profile is 1:1 with a user account and irreversible in identity: a
//! profile never changes its owning user. Institution affiliation is a plain
//! foreign-key reference, looked up by parent id at the repository.

use chrono::{DateTime, Utc};
use scolaris_core::{AppError, AppResult, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::institution::InstitutionId;
use crate::user::UserId;

/// Lowest supported grade level.
pub const GRADE_LEVEL_MIN: i16 = 1;

/// Highest supported grade level.
pub const GRADE_LEVEL_MAX: i16 = 12;

macro_rules! profile_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
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

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

profile_id!(
    /// Unique identifier for a teacher profile.
    TeacherId
);
profile_id!(
    /// Unique identifier for a student profile.
    StudentId
);
profile_id!(
    /// Unique identifier for a parent profile.
    ParentId
);

/// A teacher's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProfile {
    /// Unique identifier.
    pub id: TeacherId,
    /// Owning user; never changes after creation.
    pub user_id: UserId,
    /// Affiliated institution, if any.
    pub institution_id: Option<InstitutionId>,
    /// True when the teacher is not institution-bound.
    pub is_independent: bool,
    /// Free-form subject specialization, e.g. "Mathematics".
    pub specialization: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl TeacherProfile {
    /// Creates an independent teacher profile for a user.
    #[must_use]
    pub fn new(user_id: UserId, specialization: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: TeacherId::new(),
            user_id,
            institution_id: None,
            is_independent: true,
            specialization,
            created_at: now,
            version: Version::initial(),
        }
    }

    /// Affiliates the teacher with an institution; clears independence.
    pub fn assign_to_institution(&mut self, institution_id: InstitutionId) {
        self.institution_id = Some(institution_id);
        self.is_independent = false;
    }

    /// Removes the institution affiliation; the teacher becomes independent.
    pub fn remove_from_institution(&mut self) {
        self.institution_id = None;
        self.is_independent = true;
    }
}

/// A student's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Unique identifier.
    pub id: StudentId,
    /// Owning user; never changes after creation.
    pub user_id: UserId,
    /// Affiliated institution, if any.
    pub institution_id: Option<InstitutionId>,
    /// Current grade level, 1 through 12.
    pub grade_level: Option<i16>,
    /// Name of the school the student attends outside the platform.
    pub school_name: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl StudentProfile {
    /// Creates a student profile for a user.
    #[must_use]
    pub fn new(user_id: UserId, institution_id: Option<InstitutionId>, now: DateTime<Utc>) -> Self {
        Self {
            id: StudentId::new(),
            user_id,
            institution_id,
            grade_level: None,
            school_name: None,
            created_at: now,
            version: Version::initial(),
        }
    }

    /// Updates education info, validating the grade level range 1-12.
    pub fn update_education_info(
        &mut self,
        grade_level: Option<i16>,
        school_name: Option<String>,
    ) -> AppResult<()> {
        if let Some(grade) = grade_level
            && !(GRADE_LEVEL_MIN..=GRADE_LEVEL_MAX).contains(&grade)
        {
            return Err(AppError::Validation(format!(
                "grade level must be between {GRADE_LEVEL_MIN} and {GRADE_LEVEL_MAX}, got {grade}"
            )));
        }

        self.grade_level = grade_level;
        self.school_name = school_name;
        Ok(())
    }

    /// Affiliates the student with an institution.
    pub fn assign_to_institution(&mut self, institution_id: InstitutionId) {
        self.institution_id = Some(institution_id);
    }

    /// Removes the institution affiliation.
    pub fn remove_from_institution(&mut self) {
        self.institution_id = None;
    }
}

/// A parent's profile. Links to student users live in a separate join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentProfile {
    /// Unique identifier.
    pub id: ParentId,
    /// Owning user; never changes after creation.
    pub user_id: UserId,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl ParentProfile {
    /// Creates a parent profile for a user.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: ParentId::new(),
            user_id,
            created_at: now,
            version: Version::initial(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn removing_institution_makes_teacher_independent() {
        let mut teacher = TeacherProfile::new(UserId::new(), None, Utc::now());
        let institution = InstitutionId::new();

        teacher.assign_to_institution(institution);
        assert_eq!(teacher.institution_id, Some(institution));
        assert!(!teacher.is_independent);

        teacher.remove_from_institution();
        assert!(teacher.institution_id.is_none());
        assert!(teacher.is_independent);
    }

    #[test]
    fn grade_level_13_is_rejected() {
        let mut student = StudentProfile::new(UserId::new(), None, Utc::now());
        let result = student.update_education_info(Some(13), None);
        assert!(result.is_err());
        assert!(student.grade_level.is_none());
    }

    #[test]
    fn grade_level_bounds_are_inclusive() {
        let mut student = StudentProfile::new(UserId::new(), None, Utc::now());
        assert!(student.update_education_info(Some(1), None).is_ok());
        assert!(
            student
                .update_education_info(Some(12), Some("Northgate".to_owned()))
                .is_ok()
        );
        assert!(student.update_education_info(Some(0), None).is_err());
    }
}
