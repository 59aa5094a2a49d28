use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use scolaris_application::GoalRepository;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{AcademicGoal, GoalId, StudentId};

use crate::pg_errors::{map_insert_error, map_query_error, stale_write};

/// PostgreSQL-backed repository for academic goals.
#[derive(Clone)]
pub struct PostgresGoalRepository {
    pool: PgPool,
}

impl PostgresGoalRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GoalRow {
    id: Uuid,
    student_id: Uuid,
    title: String,
    description: Option<String>,
    progress: i16,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl GoalRow {
    fn into_domain(self) -> AppResult<AcademicGoal> {
        Ok(AcademicGoal {
            id: GoalId::from_uuid(self.id),
            student_id: StudentId::from_uuid(self.student_id),
            title: self.title,
            description: self.description,
            progress: self.progress,
            is_completed: self.is_completed,
            completed_at: self.completed_at,
            created_at: self.created_at,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[async_trait]
impl GoalRepository for PostgresGoalRepository {
    async fn insert(&self, goal: &AcademicGoal) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO academic_goals (
                id, student_id, title, description, progress, is_completed,
                completed_at, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(goal.id.as_uuid())
        .bind(goal.student_id.as_uuid())
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.progress)
        .bind(goal.is_completed)
        .bind(goal.completed_at)
        .bind(goal.created_at)
        .bind(goal.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_insert_error(error, "goal already exists"))?;

        Ok(())
    }

    async fn update(&self, goal: &AcademicGoal, expected_version: Version) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE academic_goals SET
                title = $1, description = $2, progress = $3, is_completed = $4,
                completed_at = $5, version = $6
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.progress)
        .bind(goal.is_completed)
        .bind(goal.completed_at)
        .bind(new_version.as_i64())
        .bind(goal.id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update goal"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("goal"));
        }

        Ok(new_version)
    }

    async fn find_by_id(&self, goal_id: GoalId) -> AppResult<Option<AcademicGoal>> {
        let row = sqlx::query_as::<_, GoalRow>("SELECT * FROM academic_goals WHERE id = $1")
            .bind(goal_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load goal"))?;

        row.map(GoalRow::into_domain).transpose()
    }

    async fn list_for_student(&self, student_id: StudentId) -> AppResult<Vec<AcademicGoal>> {
        let rows = sqlx::query_as::<_, GoalRow>(
            "SELECT * FROM academic_goals WHERE student_id = $1 ORDER BY created_at",
        )
        .bind(student_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list goals"))?;

        rows.into_iter().map(GoalRow::into_domain).collect()
    }
}
