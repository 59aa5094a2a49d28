//! Platform events published for external consumers.
//!
//! Events are publish-only from this core; delivery is out of scope. Each
//! variant carries enough data (ids, names, raw tokens/links) for a
//! notification service to act without querying back into this core.

use serde::{Deserialize, Serialize};

use crate::invitation::{InvitationId, InvitationKind};
use crate::user::UserId;

/// Outbound platform event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// A user account was created by an administrator.
    UserCreated {
        /// Created user.
        user_id: UserId,
        /// Canonical email.
        email: String,
        /// Display name.
        display_name: String,
        /// Temporary password to forward, for admin-created accounts.
        temporary_password: Option<String>,
    },
    /// A user self-registered.
    UserRegistered {
        /// Registered user.
        user_id: UserId,
        /// Canonical email.
        email: String,
        /// Display name.
        display_name: String,
        /// Raw email-confirmation token for the activation link.
        confirmation_token: String,
    },
    /// A user confirmed their email address.
    UserEmailConfirmed {
        /// Confirmed user.
        user_id: UserId,
        /// Canonical email.
        email: String,
    },
    /// A user requested a password reset.
    UserForgotPassword {
        /// Requesting user.
        user_id: UserId,
        /// Canonical email.
        email: String,
        /// Raw reset token for the reset link.
        reset_token: String,
    },
    /// An invitation was created.
    InvitationCreated {
        /// Created invitation.
        invitation_id: InvitationId,
        /// Addressee email.
        invitee_email: String,
        /// Display name of the inviter.
        inviter_name: String,
        /// Invitation kind.
        kind: InvitationKind,
        /// Optional message from the inviter.
        message: Option<String>,
    },
}

impl PlatformEvent {
    /// Returns the stable event type value.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UserCreated { .. } => "user_created",
            Self::UserRegistered { .. } => "user_registered",
            Self::UserEmailConfirmed { .. } => "user_email_confirmed",
            Self::UserForgotPassword { .. } => "user_forgot_password",
            Self::InvitationCreated { .. } => "invitation_created",
        }
    }
}
