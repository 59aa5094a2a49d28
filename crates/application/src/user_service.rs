//! User account lifecycle: registration, authentication, email
//! confirmation, password reset.
//!
//! Follows OWASP guidance on generic failure messages: login failures are
//! indistinguishable between unknown email and wrong password, and the
//! hasher runs on both paths to close the timing side-channel.

use std::sync::Arc;

use chrono::{Duration, Utc};

use scolaris_core::{AppError, AppResult};
use scolaris_domain::{
    EmailAddress, OneTimeToken, PlatformEvent, User, UserId, validate_password,
};

use crate::ports::identity::{EventPublisher, PasswordHasher, UserRepository};
use crate::token_crypto;

#[cfg(test)]
mod tests;

/// Validity window for email-confirmation tokens.
const CONFIRMATION_TOKEN_HOURS: i64 = 24;

/// Validity window for password-reset tokens.
const RESET_TOKEN_HOURS: i64 = 2;

/// Application service for user account lifecycle.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
            event_publisher,
        }
    }

    /// Registers a new user with email and password.
    ///
    /// Issues an email-confirmation token and publishes `UserRegistered`
    /// carrying the raw token for the activation link.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AppResult<User> {
        let email_address = EmailAddress::new(email)?;
        validate_password(password)?;

        let existing = self
            .user_repository
            .find_by_email(email_address.as_str())
            .await?;
        if existing.is_some() {
            // Hash anyway so the duplicate path costs the same as success.
            let _ = self.password_hasher.hash_password(password);
            return Err(AppError::Conflict(format!(
                "email '{}' is already registered",
                email_address.as_str()
            )));
        }

        let password_hash = self.password_hasher.hash_password(password)?;
        let now = Utc::now();
        let mut user = User::register(email_address, display_name, password_hash, now)?;

        let (raw_token, digest) = token_crypto::generate_token()?;
        user.issue_confirmation_token(OneTimeToken::new(
            digest,
            now + Duration::hours(CONFIRMATION_TOKEN_HOURS),
        ));

        self.user_repository.insert(&user).await?;
        tracing::info!(user = %user.id, "registered user");

        self.event_publisher
            .publish(PlatformEvent::UserRegistered {
                user_id: user.id,
                email: user.email.as_str().to_owned(),
                display_name: user.display_name.clone(),
                confirmation_token: raw_token,
            })
            .await?;

        Ok(user)
    }

    /// Creates an account on behalf of an institution admin, with a random
    /// temporary password and a pre-confirmed email.
    ///
    /// Returns the created user and the plaintext temporary password for
    /// the caller's response body.
    pub async fn register_with_temporary_password(
        &self,
        email: &str,
        display_name: &str,
    ) -> AppResult<(User, String)> {
        let email_address = EmailAddress::new(email)?;

        let existing = self
            .user_repository
            .find_by_email(email_address.as_str())
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "email '{}' is already registered",
                email_address.as_str()
            )));
        }

        let temporary_password = token_crypto::generate_temporary_password()?;
        let password_hash = self.password_hasher.hash_password(&temporary_password)?;

        let mut user = User::register(email_address, display_name, password_hash, Utc::now())?;
        user.email_confirmed = true;

        self.user_repository.insert(&user).await?;
        tracing::info!(user = %user.id, "created staff account");

        self.event_publisher
            .publish(PlatformEvent::UserCreated {
                user_id: user.id,
                email: user.email.as_str().to_owned(),
                display_name: user.display_name.clone(),
                temporary_password: Some(temporary_password.clone()),
            })
            .await?;

        Ok((user, temporary_password))
    }

    /// Authenticates a user with email and password.
    ///
    /// Returns a generic `Unauthorized` for unknown email, wrong password
    /// or a deactivated account, and records the login instant on success.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let user = self.user_repository.find_by_email(email).await?;

        let Some(mut user) = user else {
            // Hash anyway so unknown emails cost the same as known ones.
            let _ = self.password_hasher.hash_password(password);
            return Err(Self::invalid_credentials());
        };

        let password_valid = self
            .password_hasher
            .verify_password(password, &user.password_hash)?;
        if !password_valid || !user.is_active {
            return Err(Self::invalid_credentials());
        }

        let expected_version = user.version;
        user.record_login(Utc::now());
        user.version = self.user_repository.update(&user, expected_version).await?;

        Ok(user)
    }

    /// Confirms a user's email against a raw confirmation token.
    pub async fn confirm_email(&self, email: &str, raw_token: &str) -> AppResult<()> {
        let mut user = self.require_by_email(email).await?;
        let expected_version = user.version;

        let digest = token_crypto::hash_token(raw_token);
        user.confirm_email(&digest, Utc::now())?;
        self.user_repository.update(&user, expected_version).await?;

        self.event_publisher
            .publish(PlatformEvent::UserEmailConfirmed {
                user_id: user.id,
                email: user.email.as_str().to_owned(),
            })
            .await
    }

    /// Starts a password reset for an email address.
    ///
    /// Unknown emails succeed silently so the endpoint cannot be used for
    /// account enumeration.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let Some(mut user) = self.user_repository.find_by_email(email).await? else {
            return Ok(());
        };
        let expected_version = user.version;

        let now = Utc::now();
        let (raw_token, digest) = token_crypto::generate_token()?;
        user.issue_password_reset_token(OneTimeToken::new(
            digest,
            now + Duration::hours(RESET_TOKEN_HOURS),
        ));
        self.user_repository.update(&user, expected_version).await?;

        self.event_publisher
            .publish(PlatformEvent::UserForgotPassword {
                user_id: user.id,
                email: user.email.as_str().to_owned(),
                reset_token: raw_token,
            })
            .await
    }

    /// Completes a password reset with a raw reset token.
    pub async fn reset_password(
        &self,
        email: &str,
        raw_token: &str,
        new_password: &str,
    ) -> AppResult<()> {
        validate_password(new_password)?;

        let mut user = self.require_by_email(email).await?;
        let expected_version = user.version;

        let digest = token_crypto::hash_token(raw_token);
        let new_hash = self.password_hasher.hash_password(new_password)?;
        user.reset_password(&digest, new_hash, Utc::now())?;

        self.user_repository.update(&user, expected_version).await?;
        Ok(())
    }

    /// Changes the password for an authenticated user, verifying the
    /// current one first.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let mut user = self.require_by_id(user_id).await?;
        let expected_version = user.version;

        let current_valid = self
            .password_hasher
            .verify_password(current_password, &user.password_hash)?;
        if !current_valid {
            return Err(AppError::Unauthorized(
                "current password is incorrect".to_owned(),
            ));
        }

        validate_password(new_password)?;
        user.password_hash = self.password_hasher.hash_password(new_password)?;
        self.user_repository.update(&user, expected_version).await?;
        Ok(())
    }

    /// Returns a user by id, failing with `NotFound` when absent.
    pub async fn require_by_id(&self, user_id: UserId) -> AppResult<User> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))
    }

    /// Returns a user by email, failing with `NotFound` when absent.
    pub async fn require_by_email(&self, email: &str) -> AppResult<User> {
        self.user_repository
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{email}' not found")))
    }

    fn invalid_credentials() -> AppError {
        AppError::Unauthorized("invalid email or password".to_owned())
    }
}
