//! Scolaris API composition root.

#![forbid(unsafe_code)]

mod api_router;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use scolaris_application::{
    AccessControlService, EnrollmentService, InstitutionService, InvitationService,
    RbacAdminService, TokenService, TokenServiceConfig, UserService,
};
use scolaris_core::AppError;
use scolaris_infrastructure::{
    Argon2PasswordHasher, JwtAccessTokenSigner, PostgresAcceptanceUnit,
    PostgresAssignmentRepository, PostgresGoalRepository, PostgresInstitutionAdminRepository,
    PostgresInstitutionRepository, PostgresInvitationRepository, PostgresParentProfileRepository,
    PostgresPermissionRepository, PostgresRefreshTokenRepository, PostgresRoleRepository,
    PostgresSettingsStore, PostgresStudentProfileRepository, PostgresTeacherProfileRepository,
    PostgresUserRepository, RedisCachedSettingsStore, TracingEventPublisher,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let database_url = required_env("DATABASE_URL")?;
    let signing_secret = required_env("TOKEN_SIGNING_SECRET")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());

    let pool = connect_and_migrate(&database_url).await?;
    let app_state = build_state(pool, &signing_secret)?;

    let router = api_router::build_router(app_state, &frontend_url)?;

    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|error| AppError::Internal(format!("invalid bind address: {error}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {addr}: {error}")))?;

    info!(%addr, "scolaris api listening");
    axum::serve(listener, router)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name)
        .map_err(|_| AppError::Internal(format!("environment variable {name} is required")))
}

async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

fn build_state(pool: PgPool, signing_secret: &str) -> Result<AppState, AppError> {
    let users = Arc::new(PostgresUserRepository::new(pool.clone()));
    let roles = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let permissions = Arc::new(PostgresPermissionRepository::new(pool.clone()));
    let institutions = Arc::new(PostgresInstitutionRepository::new(pool.clone()));
    let admins = Arc::new(PostgresInstitutionAdminRepository::new(pool.clone()));
    let teacher_profiles = Arc::new(PostgresTeacherProfileRepository::new(pool.clone()));
    let student_profiles = Arc::new(PostgresStudentProfileRepository::new(pool.clone()));
    let parent_profiles = Arc::new(PostgresParentProfileRepository::new(pool.clone()));
    let assignments = Arc::new(PostgresAssignmentRepository::new(pool.clone()));
    let goals = Arc::new(PostgresGoalRepository::new(pool.clone()));
    let invitations = Arc::new(PostgresInvitationRepository::new(pool.clone()));
    let acceptance = Arc::new(PostgresAcceptanceUnit::new(pool.clone()));
    let refresh_tokens = Arc::new(PostgresRefreshTokenRepository::new(pool.clone()));

    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let event_publisher = Arc::new(TracingEventPublisher::new());
    let token_signer = Arc::new(JwtAccessTokenSigner::new(signing_secret.as_bytes()));

    let settings_store = PostgresSettingsStore::new(pool);
    let settings: Arc<dyn scolaris_application::SettingsStore> = match env::var("REDIS_URL") {
        Ok(redis_url) => {
            let client = redis::Client::open(redis_url)
                .map_err(|error| AppError::Internal(format!("invalid redis url: {error}")))?;
            Arc::new(RedisCachedSettingsStore::new(
                client,
                "scolaris:settings",
                settings_store,
            ))
        }
        Err(_) => Arc::new(settings_store),
    };

    let token_config = TokenServiceConfig {
        access_token_minutes_override: env::var("ACCESS_TOKEN_MINUTES").ok(),
        refresh_token_days_override: env::var("REFRESH_TOKEN_DAYS").ok(),
    };

    let user_service = UserService::new(users.clone(), password_hasher, event_publisher.clone());
    let token_service = TokenService::new(
        refresh_tokens,
        users.clone(),
        roles.clone(),
        token_signer.clone(),
        settings,
        token_config,
    );
    let access_control = AccessControlService::new(roles.clone());
    let rbac_admin = RbacAdminService::new(roles, permissions);
    let institution_service = InstitutionService::new(
        institutions.clone(),
        admins.clone(),
        teacher_profiles.clone(),
        student_profiles.clone(),
        user_service.clone(),
    );
    let enrollment_service = EnrollmentService::new(
        teacher_profiles.clone(),
        student_profiles.clone(),
        parent_profiles,
        assignments,
        goals,
        institutions.clone(),
    );
    let invitation_service = InvitationService::new(
        invitations,
        acceptance,
        institutions,
        admins,
        teacher_profiles,
        student_profiles,
        users,
        event_publisher,
    );

    Ok(AppState {
        users: user_service,
        tokens: token_service,
        access_control,
        rbac_admin,
        institutions: institution_service,
        enrollment: enrollment_service,
        invitations: invitation_service,
        token_signer,
    })
}
