//! User records and the directory they live in.

use crate::password::HashedPassword;
use crate::session::SessionId;
use crate::{Error, Result};
use async_lock::RwLock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

/// The unique id of a user.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// A registered user.
///
/// Serializing a user yields its public fields only.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// The unique id.
    pub id: UserId,
    /// The unique email.
    pub email: String,
    /// The password digest. Only ever compared through [`HashedPassword::verify`].
    #[serde(skip_serializing)]
    pub hashed_password: HashedPassword,
    /// The session of the single-session login flow of [`UserAuthService`](crate::UserAuthService).
    #[serde(skip_serializing)]
    pub session_id: Option<SessionId>,
    /// A pending password reset token.
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the user record last changed.
    pub updated_at: DateTime<Utc>,
}

/// The key a user is looked up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    /// Match the email.
    Email(String),
    /// Match the id.
    Id(UserId),
    /// Match the session of the single-session login flow.
    SessionId(SessionId),
    /// Match a pending reset token.
    ResetToken(String),
}

/// Changes to a user record. `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// Replace the password digest.
    pub hashed_password: Option<HashedPassword>,
    /// Set or clear the session.
    pub session_id: Option<Option<SessionId>>,
    /// Set or clear the reset token.
    pub reset_token: Option<Option<String>>,
}

/// Storage of user records.
///
/// Implementations do not need to enforce email uniqueness; callers check before they create.
#[async_trait]
pub trait UserDirectory: Debug + Send + Sync {
    /// Find the user matching `filter`, if any.
    async fn find(&self, filter: &UserFilter) -> Result<Option<User>>;

    /// Store a new user.
    async fn create(&self, email: &str, hashed_password: HashedPassword) -> Result<User>;

    /// Apply `update` to the user with the given id.
    /// Fails with [`Error::UserNotFound`] if there is no such user.
    async fn update(&self, id: &UserId, update: UserUpdate) -> Result;
}

/// # in-memory user directory
/// Because there is no external persistence, all users are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl UserId {
    /// Generate a new random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl User {
    /// A freshly registered user.
    pub fn new(email: impl Into<String>, hashed_password: HashedPassword) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email: email.into(),
            hashed_password,
            session_id: None,
            reset_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true iff `password` is this user's password.
    pub fn is_valid_password(&self, password: &str) -> bool {
        self.hashed_password.verify(password)
    }

    fn apply(&mut self, update: UserUpdate) {
        if let Some(hashed_password) = update.hashed_password {
            self.hashed_password = hashed_password;
        }
        if let Some(session_id) = update.session_id {
            self.session_id = session_id;
        }
        if let Some(reset_token) = update.reset_token {
            self.reset_token = reset_token;
        }
        self.updated_at = Utc::now();
    }
}

impl UserFilter {
    /// Returns true if `user` matches this filter.
    pub fn matches(&self, user: &User) -> bool {
        match self {
            Self::Email(email) => &user.email == email,
            Self::Id(id) => &user.id == id,
            Self::SessionId(session_id) => user.session_id.as_ref() == Some(session_id),
            Self::ResetToken(token) => user.reset_token.as_ref() == Some(token),
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find(&self, filter: &UserFilter) -> Result<Option<User>> {
        let users = self.users.read().await;
        let user = match filter {
            UserFilter::Id(id) => users.get(id),
            filter => users.values().find(|user| filter.matches(user)),
        };
        Ok(user.cloned())
    }

    async fn create(&self, email: &str, hashed_password: HashedPassword) -> Result<User> {
        let user = User::new(email, hashed_password);
        self.users.write().await.insert(user.id.clone(), user.clone());
        log::debug!("Created user {}", user.id);
        Ok(user)
    }

    async fn update(&self, id: &UserId, update: UserUpdate) -> Result {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or_else(|| Error::UserNotFound {
            id: id.to_string(),
        })?;
        user.apply(update);
        Ok(())
    }
}

impl MemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Returns true if no user is registered.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}
