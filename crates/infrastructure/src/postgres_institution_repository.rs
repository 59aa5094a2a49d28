use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use scolaris_application::{InstitutionAdminRepository, InstitutionRepository};
use scolaris_core::{AppResult, Version};
use scolaris_domain::{
    AdminTier, CapacityLimits, Institution, InstitutionAdmin, InstitutionId, InstitutionKind,
    LicenseTier, UserId,
};

use crate::pg_errors::{map_insert_error, map_query_error, stale_write};

/// PostgreSQL-backed repository for institutions.
#[derive(Clone)]
pub struct PostgresInstitutionRepository {
    pool: PgPool,
}

impl PostgresInstitutionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct InstitutionRow {
    id: Uuid,
    name: String,
    kind: String,
    license: String,
    max_students: i32,
    max_teachers: i32,
    subscription_started_at: DateTime<Utc>,
    subscription_ends_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    version: i64,
}

impl InstitutionRow {
    fn into_domain(self) -> AppResult<Institution> {
        Ok(Institution {
            id: InstitutionId::from_uuid(self.id),
            name: self.name,
            kind: InstitutionKind::parse(&self.kind)?,
            license: LicenseTier::parse(&self.license)?,
            limits: CapacityLimits {
                max_students: self.max_students,
                max_teachers: self.max_teachers,
            },
            subscription_started_at: self.subscription_started_at,
            subscription_ends_at: self.subscription_ends_at,
            is_active: self.is_active,
            created_at: self.created_at,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct CountRow {
    count: i64,
}

#[async_trait]
impl InstitutionRepository for PostgresInstitutionRepository {
    async fn insert(&self, institution: &Institution) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO institutions (
                id, name, kind, license, max_students, max_teachers,
                subscription_started_at, subscription_ends_at, is_active, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(institution.id.as_uuid())
        .bind(&institution.name)
        .bind(institution.kind.as_str())
        .bind(institution.license.as_str())
        .bind(institution.limits.max_students)
        .bind(institution.limits.max_teachers)
        .bind(institution.subscription_started_at)
        .bind(institution.subscription_ends_at)
        .bind(institution.is_active)
        .bind(institution.created_at)
        .bind(institution.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_insert_error(error, "institution already exists"))?;

        Ok(())
    }

    async fn update(
        &self,
        institution: &Institution,
        expected_version: Version,
    ) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE institutions SET
                name = $1, license = $2, max_students = $3, max_teachers = $4,
                subscription_ends_at = $5, is_active = $6, version = $7
            WHERE id = $8 AND version = $9
            "#,
        )
        .bind(&institution.name)
        .bind(institution.license.as_str())
        .bind(institution.limits.max_students)
        .bind(institution.limits.max_teachers)
        .bind(institution.subscription_ends_at)
        .bind(institution.is_active)
        .bind(new_version.as_i64())
        .bind(institution.id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update institution"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("institution"));
        }

        Ok(new_version)
    }

    async fn find_by_id(&self, institution_id: InstitutionId) -> AppResult<Option<Institution>> {
        let row = sqlx::query_as::<_, InstitutionRow>("SELECT * FROM institutions WHERE id = $1")
            .bind(institution_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load institution"))?;

        row.map(InstitutionRow::into_domain).transpose()
    }

    async fn count_active_students(&self, institution_id: InstitutionId) -> AppResult<i64> {
        let row = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT COUNT(*) AS count
            FROM student_profiles
            WHERE institution_id = $1
            "#,
        )
        .bind(institution_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to count affiliated students"))?;

        Ok(row.count)
    }

    async fn count_active_teachers(&self, institution_id: InstitutionId) -> AppResult<i64> {
        let row = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT COUNT(*) AS count
            FROM teacher_profiles
            WHERE institution_id = $1
            "#,
        )
        .bind(institution_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to count affiliated teachers"))?;

        Ok(row.count)
    }
}

/// PostgreSQL-backed repository for institution admin links.
#[derive(Clone)]
pub struct PostgresInstitutionAdminRepository {
    pool: PgPool,
}

impl PostgresInstitutionAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AdminRow {
    user_id: Uuid,
    institution_id: Uuid,
    tier: String,
    is_active: bool,
    version: i64,
}

impl AdminRow {
    fn into_domain(self) -> AppResult<InstitutionAdmin> {
        Ok(InstitutionAdmin {
            user_id: UserId::from_uuid(self.user_id),
            institution_id: InstitutionId::from_uuid(self.institution_id),
            tier: AdminTier::parse(&self.tier)?,
            is_active: self.is_active,
            version: Version::from_stored(self.version)?,
        })
    }
}

#[async_trait]
impl InstitutionAdminRepository for PostgresInstitutionAdminRepository {
    async fn insert(&self, admin: &InstitutionAdmin) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO institution_admins (user_id, institution_id, tier, is_active, version)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(admin.user_id.as_uuid())
        .bind(admin.institution_id.as_uuid())
        .bind(admin.tier.as_str())
        .bind(admin.is_active)
        .bind(admin.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_insert_error(error, "user is already an admin of this institution")
        })?;

        Ok(())
    }

    async fn update(
        &self,
        admin: &InstitutionAdmin,
        expected_version: Version,
    ) -> AppResult<Version> {
        let new_version = expected_version.next();
        let result = sqlx::query(
            r#"
            UPDATE institution_admins SET tier = $1, is_active = $2, version = $3
            WHERE user_id = $4 AND institution_id = $5 AND version = $6
            "#,
        )
        .bind(admin.tier.as_str())
        .bind(admin.is_active)
        .bind(new_version.as_i64())
        .bind(admin.user_id.as_uuid())
        .bind(admin.institution_id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to update institution admin"))?;

        if result.rows_affected() == 0 {
            return Err(stale_write("institution admin"));
        }

        Ok(new_version)
    }

    async fn find(
        &self,
        user_id: UserId,
        institution_id: InstitutionId,
    ) -> AppResult<Option<InstitutionAdmin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT * FROM institution_admins WHERE user_id = $1 AND institution_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(institution_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to load institution admin"))?;

        row.map(AdminRow::into_domain).transpose()
    }

    async fn find_for_user(&self, user_id: UserId) -> AppResult<Option<InstitutionAdmin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT * FROM institution_admins WHERE user_id = $1 LIMIT 1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to load institution admin"))?;

        row.map(AdminRow::into_domain).transpose()
    }

    async fn list_for_institution(
        &self,
        institution_id: InstitutionId,
    ) -> AppResult<Vec<InstitutionAdmin>> {
        let rows = sqlx::query_as::<_, AdminRow>(
            "SELECT * FROM institution_admins WHERE institution_id = $1",
        )
        .bind(institution_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list institution admins"))?;

        rows.into_iter().map(AdminRow::into_domain).collect()
    }
}
