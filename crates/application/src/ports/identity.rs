use async_trait::async_trait;
use scolaris_core::{AppResult, Version};
use scolaris_domain::{PlatformEvent, User, UserId};

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user. Fails with `Conflict` on a duplicate email.
    async fn insert(&self, user: &User) -> AppResult<()>;

    /// Persists user mutations, comparing `expected_version` against the
    /// stored counter. Returns the new version on success.
    async fn update(&self, user: &User, expected_version: Version) -> AppResult<Version>;

    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Finds a user by canonical email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

/// Port for password hashing. Keeps the application layer free of direct
/// cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password using Argon2id.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Publish-only port for outbound platform events. Delivery is an external
/// collaborator's concern.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event.
    async fn publish(&self, event: PlatformEvent) -> AppResult<()>;
}
