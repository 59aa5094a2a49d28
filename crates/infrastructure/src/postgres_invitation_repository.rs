use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use scolaris_application::{AcceptanceMutation, AcceptanceUnitOfWork, InvitationRepository};
use scolaris_core::{AppError, AppResult, Version};
use scolaris_domain::{
    EmailAddress, InstitutionId, Invitation, InvitationId, InvitationStatus, InvitationTarget,
    TeacherId, UserId,
};

use crate::pg_errors::{map_insert_error, map_query_error, stale_write};
use crate::postgres_assignment_repository::insert_if_absent;

/// PostgreSQL-backed repository for invitations.
#[derive(Clone)]
pub struct PostgresInvitationRepository {
    pool: PgPool,
}

impl PostgresInvitationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct InvitationRow {
    id: Uuid,
    inviter_id: Uuid,
    invitee_email: String,
    invitee_user_id: Option<Uuid>,
    kind: String,
    institution_id: Option<Uuid>,
    teacher_id: Option<Uuid>,
    message: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    version: i64,
}

impl InvitationRow {
    fn into_domain(self) -> AppResult<Invitation> {
        let target = match (self.kind.as_str(), self.institution_id, self.teacher_id) {
            ("institution", Some(institution_id), _) => InvitationTarget::Institution {
                institution_id: InstitutionId::from_uuid(institution_id),
            },
            ("teacher", _, Some(teacher_id)) => InvitationTarget::Teacher {
                teacher_id: TeacherId::from_uuid(teacher_id),
            },
            _ => {
                return Err(AppError::Internal(format!(
                    "invitation {} has inconsistent target columns",
                    self.id
                )));
            }
        };

        Ok(Invitation {
            id: InvitationId::from_uuid(self.id),
            inviter_id: UserId::from_uuid(self.inviter_id),
            invitee_email: EmailAddress::new(self.invitee_email)
                .map_err(|error| AppError::Internal(format!("stored email is invalid: {error}")))?,
            invitee_user_id: self.invitee_user_id.map(UserId::from_uuid),
            target,
            message: self.message,
            status: InvitationStatus::parse(&self.status)?,
            created_at: self.created_at,
            expires_at: self.expires_at,
            responded_at: self.responded_at,
            version: Version::from_stored(self.version)?,
        })
    }
}

fn target_columns(target: InvitationTarget) -> (Option<Uuid>, Option<Uuid>) {
    match target {
        InvitationTarget::Institution { institution_id } => (Some(institution_id.as_uuid()), None),
        InvitationTarget::Teacher { teacher_id } => (None, Some(teacher_id.as_uuid())),
    }
}

/// Applies invitation mutations inside a transaction, comparing the
/// expected version. Shared between the plain update and the acceptance
/// unit.
async fn update_in_transaction(
    transaction: &mut Transaction<'_, Postgres>,
    invitation: &Invitation,
    expected_version: Version,
) -> AppResult<Version> {
    let new_version = expected_version.next();
    let result = sqlx::query(
        r#"
        UPDATE invitations SET
            invitee_user_id = $1, status = $2, responded_at = $3, version = $4
        WHERE id = $5 AND version = $6
        "#,
    )
    .bind(invitation.invitee_user_id.map(|id| id.as_uuid()))
    .bind(invitation.status.as_str())
    .bind(invitation.responded_at)
    .bind(new_version.as_i64())
    .bind(invitation.id.as_uuid())
    .bind(expected_version.as_i64())
    .execute(&mut **transaction)
    .await
    .map_err(|error| map_query_error(error, "failed to update invitation"))?;

    if result.rows_affected() == 0 {
        return Err(stale_write("invitation"));
    }

    Ok(new_version)
}

#[async_trait]
impl InvitationRepository for PostgresInvitationRepository {
    async fn insert(&self, invitation: &Invitation) -> AppResult<()> {
        let (institution_id, teacher_id) = target_columns(invitation.target);

        sqlx::query(
            r#"
            INSERT INTO invitations (
                id, inviter_id, invitee_email, invitee_user_id, kind, institution_id,
                teacher_id, message, status, created_at, expires_at, responded_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(invitation.id.as_uuid())
        .bind(invitation.inviter_id.as_uuid())
        .bind(invitation.invitee_email.as_str())
        .bind(invitation.invitee_user_id.map(|id| id.as_uuid()))
        .bind(invitation.target.kind().as_str())
        .bind(institution_id)
        .bind(teacher_id)
        .bind(&invitation.message)
        .bind(invitation.status.as_str())
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .bind(invitation.responded_at)
        .bind(invitation.version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            // The partial unique index over pending rows is the final guard
            // against the duplicate-pending race.
            map_insert_error(
                error,
                &format!(
                    "a pending invitation for '{}' already exists",
                    invitation.invitee_email.as_str()
                ),
            )
        })?;

        Ok(())
    }

    async fn update(
        &self,
        invitation: &Invitation,
        expected_version: Version,
    ) -> AppResult<Version> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| map_query_error(error, "failed to open transaction"))?;

        let new_version = update_in_transaction(&mut transaction, invitation, expected_version).await?;

        transaction
            .commit()
            .await
            .map_err(|error| map_query_error(error, "failed to commit invitation update"))?;

        Ok(new_version)
    }

    async fn find_by_id(&self, invitation_id: InvitationId) -> AppResult<Option<Invitation>> {
        let row = sqlx::query_as::<_, InvitationRow>("SELECT * FROM invitations WHERE id = $1")
            .bind(invitation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| map_query_error(error, "failed to load invitation"))?;

        row.map(InvitationRow::into_domain).transpose()
    }

    async fn find_pending_by_email(&self, email: &str) -> AppResult<Vec<Invitation>> {
        let rows = sqlx::query_as::<_, InvitationRow>(
            "SELECT * FROM invitations WHERE invitee_email = lower($1) AND status = 'pending'",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list pending invitations"))?;

        rows.into_iter().map(InvitationRow::into_domain).collect()
    }

    async fn list_for_email(&self, email: &str) -> AppResult<Vec<Invitation>> {
        let rows = sqlx::query_as::<_, InvitationRow>(
            "SELECT * FROM invitations WHERE invitee_email = lower($1) ORDER BY created_at DESC",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_query_error(error, "failed to list invitations"))?;

        rows.into_iter().map(InvitationRow::into_domain).collect()
    }
}

/// PostgreSQL acceptance unit: the accepted invitation row and its
/// relationship mutation commit in one transaction, so an invitation can
/// never be marked accepted without the relationship forming.
#[derive(Clone)]
pub struct PostgresAcceptanceUnit {
    pool: PgPool,
}

impl PostgresAcceptanceUnit {
    /// Creates an acceptance unit with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AcceptanceUnitOfWork for PostgresAcceptanceUnit {
    async fn commit(
        &self,
        invitation: &Invitation,
        expected_version: Version,
        mutation: AcceptanceMutation,
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| map_query_error(error, "failed to open transaction"))?;

        update_in_transaction(&mut transaction, invitation, expected_version).await?;

        match mutation {
            AcceptanceMutation::CreateAssignment(assignment) => {
                insert_if_absent(&mut transaction, &assignment).await?;
            }
            AcceptanceMutation::AffiliateTeacher {
                profile,
                expected_version,
            } => {
                let new_version = expected_version.next();
                let result = sqlx::query(
                    r#"
                    UPDATE teacher_profiles
                    SET institution_id = $1, is_independent = $2, version = $3
                    WHERE id = $4 AND version = $5
                    "#,
                )
                .bind(profile.institution_id.map(|id| id.as_uuid()))
                .bind(profile.is_independent)
                .bind(new_version.as_i64())
                .bind(profile.id.as_uuid())
                .bind(expected_version.as_i64())
                .execute(&mut *transaction)
                .await
                .map_err(|error| map_query_error(error, "failed to affiliate teacher"))?;

                if result.rows_affected() == 0 {
                    return Err(stale_write("teacher profile"));
                }
            }
            AcceptanceMutation::AffiliateStudent {
                profile,
                expected_version,
            } => {
                let new_version = expected_version.next();
                let result = sqlx::query(
                    r#"
                    UPDATE student_profiles
                    SET institution_id = $1, version = $2
                    WHERE id = $3 AND version = $4
                    "#,
                )
                .bind(profile.institution_id.map(|id| id.as_uuid()))
                .bind(new_version.as_i64())
                .bind(profile.id.as_uuid())
                .bind(expected_version.as_i64())
                .execute(&mut *transaction)
                .await
                .map_err(|error| map_query_error(error, "failed to affiliate student"))?;

                if result.rows_affected() == 0 {
                    return Err(stale_write("student profile"));
                }
            }
        }

        transaction
            .commit()
            .await
            .map_err(|error| map_query_error(error, "failed to commit acceptance"))?;

        tracing::debug!(invitation = %invitation.id, "committed invitation acceptance");
        Ok(())
    }
}
