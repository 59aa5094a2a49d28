use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use scolaris_application::{
    ParentProfileRepository, StudentProfileRepository, TeacherProfileRepository,
};
use scolaris_core::{AppResult, Version};
use scolaris_domain::{
    InstitutionId, ParentId, ParentProfile, StudentId, StudentProfile, TeacherId, TeacherProfile,
    UserId,
};

use crate::pg_errors::{map_insert_error, map_query_error, stale_write};

/// PostgreSQL-backed repository for teacher profiles.
#[derive(Clone)]
pub struct PostgresTeacherProfileRepository {
    pool: PgPool,
}

impl PostgresTeacherProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TeacherRow {
    id: Uuid,
    user_id: Uuid,
    institution_id: Option<Uuid>,
    is_independent: bool,
    specialization: Option<String>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl TeacherRow {
    fn into_domain(self) -> AppResult<TeacherProfile> {
        Ok(TeacherProfile {
            id: TeacherId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            institution_id: self.institution_id.map(InstitutionId::from_uuid),
            is_independent: self.is_independent,
            specialization: self.specialization,
            created_at: self.created_at,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[async_trait]
impl TeacherProfileRepository for PostgresTeacherProfileRepository {
    async fn insert(&self, profile: &TeacherProfile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO teacher_profiles (
                id, user_id, institution_id, is_independent, specialization, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(profile.institution_id.map(|id| id.as_uuid()))
        .bind(profile.is_independent)
        .bind(&profile.specialization)
        .bind(profile.created_at)
        .bind(profile.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_insert_error(error, "user already owns a teacher profile"))?;

        Ok(())
    }

    async fn update(
        &self,
        profile: &TeacherProfile,
        expected_version: Version,
    ) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE teacher_profiles SET
                institution_id = $1, is_independent = $2, specialization = $3, version = $4
            WHERE id = $5 AND version = $6
            "#,
        )
        .bind(profile.institution_id.map(|id| id.as_uuid()))
        .bind(profile.is_independent)
        .bind(&profile.specialization)
        .bind(new_version.as_i64())
        .bind(profile.id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update teacher profile"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("teacher profile"));
        }

        Ok(new_version)
    }

    async fn find_by_id(&self, teacher_id: TeacherId) -> AppResult<Option<TeacherProfile>> {
        let row = sqlx::query_as::<_, TeacherRow>("SELECT * FROM teacher_profiles WHERE id = $1")
            .bind(teacher_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load teacher profile"))?;

        row.map(TeacherRow::into_domain).transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<TeacherProfile>> {
        let row =
            sqlx::query_as::<_, TeacherRow>("SELECT * FROM teacher_profiles WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|error| map_query_error(error, "failed to load teacher profile"))?;

        row.map(TeacherRow::into_domain).transpose()
    }

    async fn list_by_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<TeacherProfile>> {
        let rows = sqlx::query_as::<_, TeacherRow>(
            "SELECT * FROM teacher_profiles WHERE institution_id = $1",
        )
        .bind(institution_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list teacher profiles"))?;

        rows.into_iter().map(TeacherRow::into_domain).collect()
    }
}

/// PostgreSQL-backed repository for student profiles.
#[derive(Clone)]
pub struct PostgresStudentProfileRepository {
    pool: PgPool,
}

impl PostgresStudentProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct StudentRow {
    id: Uuid,
    user_id: Uuid,
    institution_id: Option<Uuid>,
    grade_level: Option<i16>,
    school_name: Option<String>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl StudentRow {
    fn into_domain(self) -> AppResult<StudentProfile> {
        Ok(StudentProfile {
            id: StudentId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            institution_id: self.institution_id.map(InstitutionId::from_uuid),
            grade_level: self.grade_level,
            school_name: self.school_name,
            created_at: self.created_at,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[async_trait]
impl StudentProfileRepository for PostgresStudentProfileRepository {
    async fn insert(&self, profile: &StudentProfile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO student_profiles (
                id, user_id, institution_id, grade_level, school_name, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(profile.institution_id.map(|id| id.as_uuid()))
        .bind(profile.grade_level)
        .bind(&profile.school_name)
        .bind(profile.created_at)
        .bind(profile.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_insert_error(error, "user already owns a student profile"))?;

        Ok(())
    }

    async fn update(
        &self,
        profile: &StudentProfile,
        expected_version: Version,
    ) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE student_profiles SET
                institution_id = $1, grade_level = $2, school_name = $3, version = $4
            WHERE id = $5 AND version = $6
            "#,
        )
        .bind(profile.institution_id.map(|id| id.as_uuid()))
        .bind(profile.grade_level)
        .bind(&profile.school_name)
        .bind(new_version.as_i64())
        .bind(profile.id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update student profile"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("student profile"));
        }

        Ok(new_version)
    }

    async fn find_by_id(&self, student_id: StudentId) -> AppResult<Option<StudentProfile>> {
        let row = sqlx::query_as::<_, StudentRow>("SELECT * FROM student_profiles WHERE id = $1")
            .bind(student_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load student profile"))?;

        row.map(StudentRow::into_domain).transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<StudentProfile>> {
        let row =
            sqlx::query_as::<_, StudentRow>("SELECT * FROM student_profiles WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|error| map_query_error(error, "failed to load student profile"))?;

        row.map(StudentRow::into_domain).transpose()
    }

    async fn list_by_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<StudentProfile>> {
        let rows = sqlx::query_as::<_, StudentRow>(
            "SELECT * FROM student_profiles WHERE institution_id = $1",
        )
        .bind(institution_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list student profiles"))?;

        rows.into_iter().map(StudentRow::into_domain).collect()
    }
}

/// PostgreSQL-backed repository for parent profiles.
#[derive(Clone)]
pub struct PostgresParentProfileRepository {
    pool: PgPool,
}

impl PostgresParentProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ParentRow {
    id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    version: i64,
}

impl ParentRow {
    fn into_domain(self) -> AppResult<ParentProfile> {
        Ok(ParentProfile {
            id: ParentId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            created_at: self.created_at,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct StudentLinkRow {
    student_id: Uuid,
}

#[async_trait]
impl ParentProfileRepository for PostgresParentProfileRepository {
    async fn insert(&self, profile: &ParentProfile) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO parent_profiles (id, user_id, created_at, version) VALUES ($1, $2, $3, $4)",
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(profile.created_at)
        .bind(profile.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_insert_error(error, "user already owns a parent profile"))?;

        Ok(())
    }

    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<ParentProfile>> {
        let row =
            sqlx::query_as::<_, ParentRow>("SELECT * FROM parent_profiles WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|error| map_query_error(error, "failed to load parent profile"))?;

        row.map(ParentRow::into_domain).transpose()
    }

    async fn add_student_link(&self, parent_id: ParentId, student_id: StudentId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO parent_students (parent_id, student_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(parent_id.as_uuid())
        .bind(student_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to link parent and student"))?;

        Ok(())
    }

    async fn list_student_ids(&self, parent_id: ParentId) -> AppResult<Vec<StudentId>> {
        let rows = sqlx::query_as::<_, StudentLinkRow>(
            "SELECT student_id FROM parent_students WHERE parent_id = $1",
        )
        .bind(parent_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list linked students"))?;

        Ok(rows
            .into_iter()
            .map(|row| StudentId::from_uuid(row.student_id))
            .collect())
    }
}
