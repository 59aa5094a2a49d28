use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller attached to a request after token verification.
///
/// Roles and permissions are a snapshot of the bindings that were current
/// when the access token was minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: Uuid,
    email: String,
    roles: Vec<String>,
    permissions: Vec<String>,
}

impl UserIdentity {
    /// Creates a user identity from verified token claims.
    #[must_use]
    pub fn new(
        subject: Uuid,
        email: impl Into<String>,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            subject,
            email: email.into(),
            roles,
            permissions,
        }
    }

    /// Returns the stable subject identifier.
    #[must_use]
    pub fn subject(&self) -> Uuid {
        self.subject
    }

    /// Returns the email the token was minted for.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the role names carried by the token.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.roles.as_slice()
    }

    /// Returns the permission keys carried by the token.
    #[must_use]
    pub fn permissions(&self) -> &[String] {
        self.permissions.as_slice()
    }

    /// Returns whether the token carries the given permission key.
    #[must_use]
    pub fn has_permission(&self, key: &str) -> bool {
        self.permissions.iter().any(|value| value == key)
    }
}
