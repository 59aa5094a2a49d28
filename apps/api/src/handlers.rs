//! HTTP handlers for the REST surface.

/// Anonymous auth endpoints: registration, login, token and password flows.
pub mod auth;
/// Institution admin endpoints: staff accounts, invitations, license.
pub mod institution;
/// Invitee-side invitation endpoints.
pub mod invitations;
/// RBAC administration endpoints.
pub mod rbac;
/// Relationship graph endpoints: assignments, education info, goals,
/// teardown.
pub mod relationships;
