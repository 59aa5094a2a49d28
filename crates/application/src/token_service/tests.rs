use std::sync::Arc;

use chrono::Utc;
use scolaris_core::AppError;
use scolaris_domain::{EmailAddress, PermissionKey, Role, User};

use crate::ports::identity::UserRepository;
use crate::ports::rbac::RoleRepository;
use crate::test_support::{
    InMemoryRefreshTokens, InMemoryRoles, InMemorySettings, InMemoryUsers, RecordingSigner,
};
use crate::token_crypto;

use super::{DEFAULT_ACCESS_TOKEN_MINUTES, TokenService, TokenServiceConfig};

struct Harness {
    refresh_tokens: Arc<InMemoryRefreshTokens>,
    roles: Arc<InMemoryRoles>,
    settings: Arc<InMemorySettings>,
    signer: Arc<RecordingSigner>,
    users: Arc<InMemoryUsers>,
    service: TokenService,
}

fn harness_with_config(config: TokenServiceConfig) -> Harness {
    let refresh_tokens = Arc::new(InMemoryRefreshTokens::default());
    let roles = Arc::new(InMemoryRoles::default());
    let settings = Arc::new(InMemorySettings::default());
    let signer = Arc::new(RecordingSigner::default());
    let users = Arc::new(InMemoryUsers::default());

    let service = TokenService::new(
        refresh_tokens.clone(),
        users.clone(),
        roles.clone(),
        signer.clone(),
        settings.clone(),
        config,
    );

    Harness {
        refresh_tokens,
        roles,
        settings,
        signer,
        users,
        service,
    }
}

fn harness() -> Harness {
    harness_with_config(TokenServiceConfig::default())
}

async fn seeded_user(harness: &Harness, email: &str) -> User {
    let address = EmailAddress::new(email).unwrap_or_else(|_| panic!("email"));
    let user =
        User::register(address, "Test User", "hash", Utc::now()).unwrap_or_else(|_| panic!("user"));
    harness
        .users
        .insert(&user)
        .await
        .unwrap_or_else(|_| panic!("insert"));
    user
}

async fn seeded_role(harness: &Harness, name: &str, keys: &[&str], deleted: bool) -> Role {
    let mut role = Role::new(name, "").unwrap_or_else(|_| panic!("role"));
    role.is_deleted = deleted;
    harness.roles.seed(role.clone()).await;
    for key in keys {
        let key = PermissionKey::new(*key).unwrap_or_else(|_| panic!("key"));
        harness
            .roles
            .add_permission(role.id, &key)
            .await
            .unwrap_or_else(|_| panic!("bind"));
    }
    role
}

#[tokio::test]
async fn access_token_snapshots_roles_and_deduped_permissions() {
    let harness = harness();
    let user = seeded_user(&harness, "mira@example.org").await;

    let teacher = seeded_role(&harness, "Teacher", &["students.read", "lessons.write"], false).await;
    let coordinator = seeded_role(&harness, "Coordinator", &["students.read"], false).await;
    let legacy = seeded_role(&harness, "Legacy", &["legacy.read"], true).await;

    for role in [&teacher, &coordinator, &legacy] {
        harness
            .roles
            .assign_to_user(user.id, role.id)
            .await
            .unwrap_or_else(|_| panic!("assign"));
    }

    harness
        .service
        .generate_access_token(&user)
        .await
        .unwrap_or_else(|_| panic!("mint"));

    let signed = harness.signer.signed();
    assert_eq!(signed.len(), 1);
    let claims = &signed[0];

    assert_eq!(claims.subject, user.id);
    assert_eq!(claims.email, "mira@example.org");
    assert_eq!(claims.roles.len(), 2);
    assert!(!claims.roles.contains(&"Legacy".to_owned()));

    // students.read reachable via two roles appears exactly once.
    assert_eq!(
        claims
            .permissions
            .iter()
            .filter(|key| key.as_str() == "students.read")
            .count(),
        1
    );
    assert_eq!(claims.permissions.len(), 2);
}

#[tokio::test]
async fn lifetime_defaults_to_thirty_minutes() {
    let harness = harness();
    let user = seeded_user(&harness, "mira@example.org").await;

    harness
        .service
        .generate_access_token(&user)
        .await
        .unwrap_or_else(|_| panic!("mint"));

    let claims = harness.signer.signed().pop().unwrap_or_else(|| panic!("claims"));
    let lifetime = claims.expires_at - claims.issued_at;
    assert_eq!(lifetime.num_minutes(), DEFAULT_ACCESS_TOKEN_MINUTES);
}

#[tokio::test]
async fn unparseable_configuration_falls_back_without_error() {
    let harness = harness_with_config(TokenServiceConfig {
        access_token_minutes_override: Some("not-a-number".to_owned()),
        refresh_token_days_override: None,
    });
    harness.settings.seed("auth.access_token_minutes", "garbage").await;
    let user = seeded_user(&harness, "mira@example.org").await;

    harness
        .service
        .generate_access_token(&user)
        .await
        .unwrap_or_else(|_| panic!("mint"));

    let claims = harness.signer.signed().pop().unwrap_or_else(|| panic!("claims"));
    let lifetime = claims.expires_at - claims.issued_at;
    assert_eq!(lifetime.num_minutes(), DEFAULT_ACCESS_TOKEN_MINUTES);
}

#[tokio::test]
async fn environment_override_beats_settings_store() {
    let harness = harness_with_config(TokenServiceConfig {
        access_token_minutes_override: Some("5".to_owned()),
        refresh_token_days_override: None,
    });
    harness.settings.seed("auth.access_token_minutes", "90").await;
    let user = seeded_user(&harness, "mira@example.org").await;

    harness
        .service
        .generate_access_token(&user)
        .await
        .unwrap_or_else(|_| panic!("mint"));

    let claims = harness.signer.signed().pop().unwrap_or_else(|| panic!("claims"));
    assert_eq!((claims.expires_at - claims.issued_at).num_minutes(), 5);
}

#[tokio::test]
async fn settings_store_value_is_used_when_no_override() {
    let harness = harness();
    harness.settings.seed("auth.access_token_minutes", "90").await;
    let user = seeded_user(&harness, "mira@example.org").await;

    harness
        .service
        .generate_access_token(&user)
        .await
        .unwrap_or_else(|_| panic!("mint"));

    let claims = harness.signer.signed().pop().unwrap_or_else(|| panic!("claims"));
    assert_eq!((claims.expires_at - claims.issued_at).num_minutes(), 90);
}

#[tokio::test]
async fn refresh_token_stores_digest_not_raw_value() {
    let harness = harness();
    let user = seeded_user(&harness, "mira@example.org").await;

    let (raw, record) = harness
        .service
        .generate_refresh_token(user.id, Some("10.0.0.1".to_owned()))
        .await
        .unwrap_or_else(|_| panic!("issue"));

    assert_ne!(raw, record.token_digest);
    assert_eq!(token_crypto::hash_token(&raw), record.token_digest);
    assert!(
        harness
            .refresh_tokens
            .stored(&record.token_digest)
            .await
            .is_some()
    );
}

#[tokio::test]
async fn refresh_rotates_the_presented_token() {
    let harness = harness();
    let user = seeded_user(&harness, "mira@example.org").await;

    let pair = harness
        .service
        .issue_token_pair(&user, None)
        .await
        .unwrap_or_else(|_| panic!("issue"));

    let rotated = harness
        .service
        .refresh(&pair.refresh_token, Some("10.0.0.2".to_owned()))
        .await
        .unwrap_or_else(|_| panic!("refresh"));
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    let old_digest = token_crypto::hash_token(&pair.refresh_token);
    let old = harness
        .refresh_tokens
        .stored(&old_digest)
        .await
        .unwrap_or_else(|| panic!("old token"));
    assert!(old.is_revoked());
    assert_eq!(old.revoked_reason.as_deref(), Some("rotated"));

    // A rotated token cannot be replayed.
    let replay = harness.service.refresh(&pair.refresh_token, None).await;
    assert!(matches!(replay, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn revoke_twice_is_idempotent() {
    let harness = harness();
    let user = seeded_user(&harness, "mira@example.org").await;

    let (raw, record) = harness
        .service
        .generate_refresh_token(user.id, None)
        .await
        .unwrap_or_else(|_| panic!("issue"));

    harness
        .service
        .revoke(&raw, Some("10.0.0.1".to_owned()), "logout")
        .await
        .unwrap_or_else(|_| panic!("revoke"));

    let first = harness
        .refresh_tokens
        .stored(&record.token_digest)
        .await
        .unwrap_or_else(|| panic!("token"));

    harness
        .service
        .revoke(&raw, Some("10.0.0.9".to_owned()), "again")
        .await
        .unwrap_or_else(|_| panic!("revoke again"));

    let second = harness
        .refresh_tokens
        .stored(&record.token_digest)
        .await
        .unwrap_or_else(|| panic!("token"));

    assert_eq!(first.revoked_at, second.revoked_at);
    assert_eq!(second.revoked_reason.as_deref(), Some("logout"));
}

#[tokio::test]
async fn unknown_refresh_token_is_unauthorized() {
    let harness = harness();
    let result = harness.service.refresh("bogus", None).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}
