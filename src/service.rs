//! Registration, login and password recovery against a user directory.
//!
//! This is the single-session flow: a user has at most one session, stored on the user record
//! itself. Logging in again replaces the previous session.

use crate::password::hash_password;
use crate::session_store::cookie_generator::{
    DefaultSessionCookieGenerator, SessionCookieGenerator,
};
use crate::user::{User, UserDirectory, UserFilter, UserId, UserUpdate};
use crate::{Error, Result, SessionId};
use std::sync::Arc;

/// Account operations on top of a [`UserDirectory`].
#[derive(Debug, Clone)]
pub struct UserAuthService {
    directory: Arc<dyn UserDirectory>,
    cookie_generator: DefaultSessionCookieGenerator,
}

impl UserAuthService {
    /// Operate on the users of `directory`.
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            directory,
            cookie_generator: DefaultSessionCookieGenerator::default(),
        }
    }

    /// Register a new user.
    ///
    /// Fails with [`Error::UserAlreadyExists`] if the email is taken.
    pub async fn register_user(&self, email: &str, password: &str) -> Result<User> {
        if self.find_by_email(email).await?.is_some() {
            return Err(Error::UserAlreadyExists {
                email: email.to_owned(),
            });
        }
        self.directory.create(email, hash_password(password)?).await
    }

    /// Returns true iff a user with `email` exists and `password` is theirs.
    pub async fn valid_login(&self, email: &str, password: &str) -> Result<bool> {
        Ok(self
            .find_by_email(email)
            .await?
            .is_some_and(|user| user.is_valid_password(password)))
    }

    /// Start a session for the user with `email`, replacing any previous one.
    /// Returns the session cookie value, or `None` for an unknown email.
    pub async fn create_session(&self, email: &str) -> Result<Option<String>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        let cookie_value = self.cookie_generator.generate_cookie();
        self.directory
            .update(
                &user.id,
                UserUpdate {
                    session_id: Some(Some(SessionId::from_cookie_value(&cookie_value))),
                    ..Default::default()
                },
            )
            .await?;
        Ok(Some(cookie_value))
    }

    /// The user logged in by `cookie_value`.
    pub async fn get_user_from_session_id(&self, cookie_value: &str) -> Result<Option<User>> {
        if cookie_value.is_empty() {
            return Ok(None);
        }
        self.directory
            .find(&UserFilter::SessionId(SessionId::from_cookie_value(
                cookie_value,
            )))
            .await
    }

    /// End the session of the given user.
    pub async fn destroy_session(&self, user_id: &UserId) -> Result {
        self.directory
            .update(
                user_id,
                UserUpdate {
                    session_id: Some(None),
                    ..Default::default()
                },
            )
            .await
    }

    /// Issue a password reset token for the user with `email`.
    ///
    /// Fails with [`Error::InvalidResetRequest`] for an unknown email.
    pub async fn get_reset_password_token(&self, email: &str) -> Result<String> {
        let Some(user) = self.find_by_email(email).await? else {
            return Err(Error::InvalidResetRequest);
        };
        let reset_token = uuid::Uuid::new_v4().to_string();
        self.directory
            .update(
                &user.id,
                UserUpdate {
                    reset_token: Some(Some(reset_token.clone())),
                    ..Default::default()
                },
            )
            .await?;
        Ok(reset_token)
    }

    /// Set a new password using a reset token. The token is used up.
    ///
    /// Fails with [`Error::InvalidResetRequest`] for an unknown token.
    pub async fn update_password(&self, reset_token: &str, password: &str) -> Result {
        if reset_token.is_empty() {
            return Err(Error::InvalidResetRequest);
        }
        let Some(user) = self
            .directory
            .find(&UserFilter::ResetToken(reset_token.to_owned()))
            .await?
        else {
            return Err(Error::InvalidResetRequest);
        };
        self.directory
            .update(
                &user.id,
                UserUpdate {
                    hashed_password: Some(hash_password(password)?),
                    reset_token: Some(None),
                    ..Default::default()
                },
            )
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.directory
            .find(&UserFilter::Email(email.to_owned()))
            .await
    }
}
