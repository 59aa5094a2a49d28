use std::sync::Arc;

use scolaris_application::{
    AccessControlService, AccessTokenSigner, EnrollmentService, InstitutionService,
    InvitationService, RbacAdminService, TokenService, UserService,
};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User account lifecycle.
    pub users: UserService,
    /// Access and refresh token lifecycle.
    pub tokens: TokenService,
    /// Effective-permission resolution and role bindings.
    pub access_control: AccessControlService,
    /// Role and permission administration.
    pub rbac_admin: RbacAdminService,
    /// Institution registry and capacity control.
    pub institutions: InstitutionService,
    /// Relationship graph operations.
    pub enrollment: EnrollmentService,
    /// Invitation workflow.
    pub invitations: InvitationService,
    /// Token signer used by the bearer middleware.
    pub token_signer: Arc<dyn AccessTokenSigner>,
}
