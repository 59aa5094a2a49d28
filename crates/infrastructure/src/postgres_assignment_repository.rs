use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use scolaris_application::AssignmentRepository;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{AssignmentId, StudentId, TeacherId, TeacherStudentAssignment};

use crate::pg_errors::{map_query_error, stale_write};

/// PostgreSQL-backed repository for teacher-student assignments.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
    subject: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    is_active: bool,
    version: i64,
}

impl AssignmentRow {
    fn into_domain(self) -> AppResult<TeacherStudentAssignment> {
        Ok(TeacherStudentAssignment {
            id: AssignmentId::from_uuid(self.id),
            teacher_id: TeacherId::from_uuid(self.teacher_id),
            student_id: StudentId::from_uuid(self.student_id),
            subject: self.subject,
            started_at: self.started_at,
            ended_at: self.ended_at,
            is_active: self.is_active,
            version: Version::from_stored(self.version)?,
        })
    }
}

/// Inserts an assignment unless the unique triple already exists. Shared
/// with the transactional acceptance unit, which runs it inside its own
/// transaction.
pub(crate) async fn insert_if_absent(
    transaction: &mut Transaction<'_, Postgres>,
    assignment: &TeacherStudentAssignment,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO teacher_student_assignments (
            id, teacher_id, student_id, subject, started_at, ended_at, is_active, version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (teacher_id, student_id, subject) DO NOTHING
        "#,
    )
    .bind(assignment.id.as_uuid())
    .bind(assignment.teacher_id.as_uuid())
    .bind(assignment.student_id.as_uuid())
    .bind(&assignment.subject)
    .bind(assignment.started_at)
    .bind(assignment.ended_at)
    .bind(assignment.is_active)
    .bind(assignment.version.as_i64())
    .execute(&mut **transaction)
    .await
    .map_err(|error| map_query_error(error, "failed to create assignment"))?;

    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn create_if_absent(&self, assignment: &TeacherStudentAssignment) -> AppResult<bool> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| map_query_error(error, "failed to open transaction"))?;

        let created = insert_if_absent(&mut transaction, assignment).await?;

        transaction
            .commit()
            .await
            .map_err(|error| map_query_error(error, "failed to commit assignment"))?;

        Ok(created)
    }

    async fn update(
        &self,
        assignment: &TeacherStudentAssignment,
        expected_version: Version,
    ) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE teacher_student_assignments
            SET ended_at = $1, is_active = $2, version = $3
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(assignment.ended_at)
        .bind(assignment.is_active)
        .bind(new_version.as_i64())
        .bind(assignment.id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update assignment"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("assignment"));
        }

        Ok(new_version)
    }

    async fn find_by_id(
        &self,
        assignment_id: AssignmentId,
    ) -> AppResult<Option<TeacherStudentAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            "SELECT * FROM teacher_student_assignments WHERE id = $1",
        )
        .bind(assignment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to load assignment"))?;

        row.map(AssignmentRow::into_domain).transpose()
    }

    async fn list_for_teacher(
        &self,
        teacher_id: TeacherId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT * FROM teacher_student_assignments
            WHERE teacher_id = $1 AND (is_active = true OR $2)
            ORDER BY started_at
            "#,
        )
        .bind(teacher_id.as_uuid())
        .bind(include_ended)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list assignments"))?;

        rows.into_iter().map(AssignmentRow::into_domain).collect()
    }

    async fn list_for_student(
        &self,
        student_id: StudentId,
        include_ended: bool,
    ) -> AppResult<Vec<TeacherStudentAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT * FROM teacher_student_assignments
            WHERE student_id = $1 AND (is_active = true OR $2)
            ORDER BY started_at
            "#,
        )
        .bind(student_id.as_uuid())
        .bind(include_ended)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list assignments"))?;

        rows.into_iter().map(AssignmentRow::into_domain).collect()
    }
}
