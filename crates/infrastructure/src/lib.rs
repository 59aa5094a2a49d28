//! Infrastructure adapters for the Scolaris identity core: PostgreSQL
//! repositories, Argon2id password hashing, HS256 token signing, the
//! Redis-cached settings store and the tracing event publisher.

#![forbid(unsafe_code)]

/// Argon2id password hasher.
pub mod argon2_password_hasher;
/// HS256 access token signer.
pub mod jwt_access_token_signer;
/// Error mapping helpers shared by the PostgreSQL repositories.
mod pg_errors;
/// Teacher-student assignment repository.
pub mod postgres_assignment_repository;
/// Academic goal repository.
pub mod postgres_goal_repository;
/// Institution and institution-admin repositories.
pub mod postgres_institution_repository;
/// Invitation repository and the transactional acceptance unit.
pub mod postgres_invitation_repository;
/// Permission repository.
pub mod postgres_permission_repository;
/// Teacher, student and parent profile repositories.
pub mod postgres_profile_repository;
/// Refresh token repository.
pub mod postgres_refresh_token_repository;
/// Role repository with permission and user bindings.
pub mod postgres_role_repository;
/// Settings store with Redis read-through cache.
pub mod settings_store;
/// User repository.
pub mod postgres_user_repository;
/// Event publisher writing structured tracing records.
pub mod tracing_event_publisher;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use jwt_access_token_signer::JwtAccessTokenSigner;
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_goal_repository::PostgresGoalRepository;
pub use postgres_institution_repository::{
    PostgresInstitutionAdminRepository, PostgresInstitutionRepository,
};
pub use postgres_invitation_repository::{PostgresAcceptanceUnit, PostgresInvitationRepository};
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_profile_repository::{
    PostgresParentProfileRepository, PostgresStudentProfileRepository,
    PostgresTeacherProfileRepository,
};
pub use postgres_refresh_token_repository::PostgresRefreshTokenRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_user_repository::PostgresUserRepository;
pub use settings_store::{PostgresSettingsStore, RedisCachedSettingsStore};
pub use tracing_event_publisher::TracingEventPublisher;
