//! Academic goals tracked against a student profile.

use chrono::{DateTime, Utc};
use scolaris_core::{AppError, AppResult, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::StudentId;

/// Unique identifier for an academic goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(Uuid);

impl GoalId {
    /// Creates a new random goal identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a goal identifier from an existing UUID value.
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

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GoalId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A goal a student is working toward, with 0-100 progress tracking.
///
/// Reaching 100 completes the goal; regressing below 100 re-opens it and
/// clears the completion timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicGoal {
    /// Unique identifier.
    pub id: GoalId,
    /// Owning student profile.
    pub student_id: StudentId,
    /// Short goal title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Progress percentage, 0 through 100.
    pub progress: i16,
    /// Whether the goal has been completed.
    pub is_completed: bool,
    /// Instant the goal reached 100 percent, if completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl AcademicGoal {
    /// Creates a new goal at zero progress.
    pub fn new(
        student_id: StudentId,
        title: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(AppError::Validation(
                "goal title must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id: GoalId::new(),
            student_id,
            title,
            description,
            progress: 0,
            is_completed: false,
            completed_at: None,
            created_at: now,
            version: Version::initial(),
        })
    }

    /// Updates progress, validating the 0-100 range.
    pub fn update_progress(&mut self, progress: i16, now: DateTime<Utc>) -> AppResult<()> {
        if !(0..=100).contains(&progress) {
            return Err(AppError::Validation(format!(
                "progress must be between 0 and 100, got {progress}"
            )));
        }

        self.progress = progress;
        if progress == 100 {
            self.is_completed = true;
            self.completed_at = Some(now);
        } else {
            self.is_completed = false;
            self.completed_at = None;
        }

        Ok(())
    }
}
