//! Dynamic role and permission entities.
//!
//! Roles and permissions are admin-managed rows, not hardcoded enums: the
//! platform grows new permission keys without a schema change. Entries
//! flagged as system are seeded at install time and protected from rename
//! and deletion.

use scolaris_core::{AppError, AppResult, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated permission key, e.g. `students.read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Creates a validated permission key.
    ///
    /// Keys are trimmed, lowercased, limited to 100 characters, and restricted
    /// to ASCII alphanumerics plus `.`, `_` and `-`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "permission key must not be empty".to_owned(),
            ));
        }

        if trimmed.len() > 100 {
            return Err(AppError::Validation(
                "permission key must not exceed 100 characters".to_owned(),
            ));
        }

        let well_formed = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !well_formed {
            return Err(AppError::Validation(format!(
                "permission key '{trimmed}' contains invalid characters"
            )));
        }

        Ok(Self(trimmed))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.0
    }
}

impl std::fmt::Display for PermissionKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// An admin-managed role owning a set of permission-key bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether this is a protected built-in role.
    pub is_system: bool,
    /// Soft-delete flag; deleted roles are hidden from listings but their
    /// rows and bindings survive for restore.
    pub is_deleted: bool,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl Role {
    /// Creates a new custom (non-system) role.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id: RoleId::new(),
            name,
            description: description.into(),
            is_system: false,
            is_deleted: false,
            version: Version::initial(),
        })
    }

    /// Updates name and description.
    ///
    /// Fails with [`AppError::SystemEntityProtected`] for system roles, which
    /// are immutable in name.
    pub fn update(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<()> {
        if self.is_system {
            return Err(AppError::SystemEntityProtected(format!(
                "system role '{}' cannot be modified",
                self.name
            )));
        }

        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty".to_owned(),
            ));
        }

        self.name = name;
        self.description = description.into();
        Ok(())
    }

    /// Soft-deletes the role.
    ///
    /// Fails with [`AppError::SystemEntityProtected`] for system roles.
    pub fn mark_deleted(&mut self) -> AppResult<()> {
        if self.is_system {
            return Err(AppError::SystemEntityProtected(format!(
                "system role '{}' cannot be deleted",
                self.name
            )));
        }

        self.is_deleted = true;
        Ok(())
    }

    /// Clears the soft-delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }
}

/// An admin-managed permission entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission key.
    pub key: PermissionKey,
    /// Human-readable description.
    pub description: String,
    /// Display group, e.g. `students` or `roles`.
    pub group: String,
    /// Whether this is a protected built-in permission.
    pub is_system: bool,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Optimistic-concurrency token.
    pub version: Version,
}

impl Permission {
    /// Creates a new custom (non-system) permission.
    #[must_use]
    pub fn new(key: PermissionKey, description: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            key,
            description: description.into(),
            group: group.into(),
            is_system: false,
            is_deleted: false,
            version: Version::initial(),
        }
    }

    /// Updates description and group.
    ///
    /// Fails with [`AppError::SystemEntityProtected`] for system permissions.
    pub fn update(
        &mut self,
        description: impl Into<String>,
        group: impl Into<String>,
    ) -> AppResult<()> {
        if self.is_system {
            return Err(AppError::SystemEntityProtected(format!(
                "system permission '{}' cannot be modified",
                self.key
            )));
        }

        self.description = description.into();
        self.group = group.into();
        Ok(())
    }

    /// Soft-deletes the permission.
    ///
    /// Fails with [`AppError::SystemEntityProtected`] for system permissions.
    pub fn mark_deleted(&mut self) -> AppResult<()> {
        if self.is_system {
            return Err(AppError::SystemEntityProtected(format!(
                "system permission '{}' cannot be deleted",
                self.key
            )));
        }

        self.is_deleted = true;
        Ok(())
    }

    /// Clears the soft-delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }
}
