//! Application services and ports for the Scolaris identity core.
//!
//! Services orchestrate the domain through repository ports; everything
//! stateful lives behind an `Arc<dyn Trait>` so infrastructure can swap
//! PostgreSQL for in-memory fakes under test.

#![forbid(unsafe_code)]

/// Effective-permission resolution and role bindings.
pub mod access_control_service;
/// Relationship graph: profiles, affiliations, assignments, goals.
pub mod enrollment_service;
/// Institution registry and capacity control.
pub mod institution_service;
/// Invitation workflow orchestration.
pub mod invitation_service;
/// Repository and collaborator ports.
pub mod ports;
/// Role and permission administration.
pub mod rbac_admin_service;
/// Token crypto helpers shared by services.
pub mod token_crypto;
/// Access and refresh token lifecycle.
pub mod token_service;
/// User account lifecycle.
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use access_control_service::AccessControlService;
pub use enrollment_service::EnrollmentService;
pub use institution_service::{CreatedStaffAccount, InstitutionService};
pub use invitation_service::InvitationService;
pub use ports::enrollment::{
    AssignmentRepository, GoalRepository, ParentProfileRepository, StudentProfileRepository,
    TeacherProfileRepository,
};
pub use ports::identity::{EventPublisher, PasswordHasher, UserRepository};
pub use ports::invitations::{AcceptanceMutation, AcceptanceUnitOfWork, InvitationRepository};
pub use ports::rbac::{PermissionRepository, RoleRepository};
pub use ports::registry::{InstitutionAdminRepository, InstitutionRepository};
pub use ports::tokens::{
    AccessTokenClaims, AccessTokenSigner, RefreshTokenRepository, SettingsStore,
};
pub use rbac_admin_service::RbacAdminService;
pub use token_service::{IssuedTokenPair, TokenService, TokenServiceConfig};
pub use user_service::UserService;
