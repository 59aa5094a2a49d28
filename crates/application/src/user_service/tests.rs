use std::sync::Arc;

use scolaris_core::AppError;
use scolaris_domain::PlatformEvent;

use crate::ports::identity::UserRepository;
use crate::test_support::{CollectingEventPublisher, FakePasswordHasher, InMemoryUsers};

use super::UserService;

struct Harness {
    users: Arc<InMemoryUsers>,
    events: Arc<CollectingEventPublisher>,
    service: UserService,
}

fn harness() -> Harness {
    let users = Arc::new(InMemoryUsers::default());
    let events = Arc::new(CollectingEventPublisher::default());
    let service = UserService::new(users.clone(), Arc::new(FakePasswordHasher), events.clone());
    Harness {
        users,
        events,
        service,
    }
}

fn registered_token(events: &[PlatformEvent]) -> String {
    events
        .iter()
        .find_map(|event| match event {
            PlatformEvent::UserRegistered {
                confirmation_token, ..
            } => Some(confirmation_token.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("expected a UserRegistered event"))
}

#[tokio::test]
async fn register_publishes_event_with_confirmation_token() {
    let harness = harness();

    let user = harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    assert!(!user.email_confirmed);
    assert!(user.confirmation_token.is_some());

    let events = harness.events.events().await;
    let token = registered_token(&events);
    assert_eq!(token.len(), 64);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let harness = harness();
    harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    let result = harness
        .service
        .register("Mira@Example.org", "another-passphrase", "Mira Again")
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn login_succeeds_and_records_instant() {
    let harness = harness();
    harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    let user = harness
        .service
        .login("mira@example.org", "a-solid-passphrase")
        .await
        .unwrap_or_else(|_| panic!("login"));

    assert!(user.last_login_at.is_some());

    let stored = harness
        .users
        .find_by_email("mira@example.org")
        .await
        .unwrap_or_else(|_| panic!("lookup"))
        .unwrap_or_else(|| panic!("stored user"));
    assert!(stored.last_login_at.is_some());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let harness = harness();
    harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    let wrong_password = harness
        .service
        .login("mira@example.org", "not-the-password")
        .await;
    let unknown_email = harness
        .service
        .login("ghost@example.org", "a-solid-passphrase")
        .await;

    let Err(AppError::Unauthorized(wrong_message)) = wrong_password else {
        panic!("expected unauthorized");
    };
    let Err(AppError::Unauthorized(unknown_message)) = unknown_email else {
        panic!("expected unauthorized");
    };
    assert_eq!(wrong_message, unknown_message);
}

#[tokio::test]
async fn deactivated_account_cannot_login() {
    let harness = harness();
    let mut user = harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    user.deactivate();
    harness
        .users
        .update(&user, user.version)
        .await
        .unwrap_or_else(|_| panic!("update"));

    let result = harness
        .service
        .login("mira@example.org", "a-solid-passphrase")
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn confirm_email_roundtrip() {
    let harness = harness();
    harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    let token = registered_token(&harness.events.events().await);
    harness
        .service
        .confirm_email("mira@example.org", &token)
        .await
        .unwrap_or_else(|_| panic!("confirm"));

    let stored = harness
        .users
        .find_by_email("mira@example.org")
        .await
        .unwrap_or_else(|_| panic!("lookup"))
        .unwrap_or_else(|| panic!("stored user"));
    assert!(stored.email_confirmed);

    let events = harness.events.events().await;
    assert!(
        events
            .iter()
            .any(|event| matches!(event, PlatformEvent::UserEmailConfirmed { .. }))
    );
}

#[tokio::test]
async fn confirm_email_rejects_bogus_token() {
    let harness = harness();
    harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    let result = harness
        .service
        .confirm_email("mira@example.org", "bogus")
        .await;
    assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));
}

#[tokio::test]
async fn forgot_password_is_silent_for_unknown_email() {
    let harness = harness();
    let result = harness.service.forgot_password("ghost@example.org").await;
    assert!(result.is_ok());
    assert!(harness.events.events().await.is_empty());
}

#[tokio::test]
async fn password_reset_roundtrip() {
    let harness = harness();
    harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    harness
        .service
        .forgot_password("mira@example.org")
        .await
        .unwrap_or_else(|_| panic!("forgot"));

    let reset_token = harness
        .events
        .events()
        .await
        .iter()
        .find_map(|event| match event {
            PlatformEvent::UserForgotPassword { reset_token, .. } => Some(reset_token.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("expected a UserForgotPassword event"));

    harness
        .service
        .reset_password("mira@example.org", &reset_token, "a-brand-new-passphrase")
        .await
        .unwrap_or_else(|_| panic!("reset"));

    assert!(
        harness
            .service
            .login("mira@example.org", "a-brand-new-passphrase")
            .await
            .is_ok()
    );
    assert!(
        harness
            .service
            .login("mira@example.org", "a-solid-passphrase")
            .await
            .is_err()
    );
}

#[tokio::test]
async fn temporary_password_account_is_preconfirmed() {
    let harness = harness();

    let (user, temporary_password) = harness
        .service
        .register_with_temporary_password("staff@example.org", "Staff Member")
        .await
        .unwrap_or_else(|_| panic!("create"));

    assert!(user.email_confirmed);
    assert!(
        harness
            .service
            .login("staff@example.org", &temporary_password)
            .await
            .is_ok()
    );

    let events = harness.events.events().await;
    assert!(events.iter().any(|event| matches!(
        event,
        PlatformEvent::UserCreated {
            temporary_password: Some(_),
            ..
        }
    )));
}

#[tokio::test]
async fn change_password_requires_current() {
    let harness = harness();
    let user = harness
        .service
        .register("mira@example.org", "a-solid-passphrase", "Mira")
        .await
        .unwrap_or_else(|_| panic!("register"));

    let result = harness
        .service
        .change_password(user.id, "wrong-current", "a-brand-new-passphrase")
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    harness
        .service
        .change_password(user.id, "a-solid-passphrase", "a-brand-new-passphrase")
        .await
        .unwrap_or_else(|_| panic!("change"));
}
