//! Teacher-student assignment pairings.

use chrono::{DateTime, Utc};
use scolaris_core::{AppError, AppResult, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::{StudentId, TeacherId};

/// Unique identifier for a teacher-student assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
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

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A time-bounded pairing of a teacher and a student for one subject.
///
/// The `(teacher_id, student_id, subject)` triple is unique in storage.
/// Assignments are never physically removed; ending one keeps the row for
/// audit history, and it can later be reactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherStudentAssignment {
    /// Unique identifier.
    pub id: AssignmentId,
    /// Teaching side of the pairing.
    pub teacher_id: TeacherId,
    /// Learning side of the pairing.
    pub student_id: StudentId,
    /// Subject taught, e.g. "Mathematics".
    pub subject: String,
    /// Instant the pairing started.
    pub started_at: DateTime<Utc>,
    /// Instant the pairing ended, if it has.
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the pairing is currently active.
    pub is_active: bool,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl TeacherStudentAssignment {
    /// Creates an active assignment.
    pub fn new(
        teacher_id: TeacherId,
        student_id: StudentId,
        subject: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(AppError::Validation(
                "assignment subject must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id: AssignmentId::new(),
            teacher_id,
            student_id,
            subject,
            started_at: now,
            ended_at: None,
            is_active: true,
            version: Version::initial(),
        })
    }

    /// Ends the pairing, preserving the row for history.
    ///
    /// Ending an already-ended assignment is a no-op that keeps the original
    /// end date.
    pub fn end(&mut self, now: DateTime<Utc>) {
        if !self.is_active {
            return;
        }

        self.ended_at = Some(now);
        self.is_active = false;
    }

    /// Reactivates an ended pairing, clearing the end date.
    pub fn reactivate(&mut self) {
        self.ended_at = None;
        self.is_active = true;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn end_preserves_history_and_is_idempotent() {
        let now = Utc::now();
        let mut assignment =
            TeacherStudentAssignment::new(TeacherId::new(), StudentId::new(), "Physics", now)
                .unwrap_or_else(|_| panic!("test assignment"));

        assignment.end(now);
        assert!(!assignment.is_active);
        assert_eq!(assignment.ended_at, Some(now));

        assignment.end(now + Duration::days(1));
        assert_eq!(assignment.ended_at, Some(now));
    }

    #[test]
    fn reactivate_clears_end_date() {
        let now = Utc::now();
        let mut assignment =
            TeacherStudentAssignment::new(TeacherId::new(), StudentId::new(), "Physics", now)
                .unwrap_or_else(|_| panic!("test assignment"));

        assignment.end(now);
        assignment.reactivate();

        assert!(assignment.is_active);
        assert!(assignment.ended_at.is_none());
    }

    #[test]
    fn blank_subject_is_rejected() {
        let result =
            TeacherStudentAssignment::new(TeacherId::new(), StudentId::new(), "  ", Utc::now());
        assert!(result.is_err());
    }
}
