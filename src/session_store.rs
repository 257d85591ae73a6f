use crate::session::SessionRecord;
use crate::user::UserId;
use crate::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Generation of session cookie values.
pub(crate) mod cookie_generator;

/// Writing a session may fail if the id already exists.
/// This constant indicates how often a store retries with different randomly generated ids until it gives up.
pub const MAXIMUM_RETRIES_ON_ID_COLLISION: u32 = 8;

/// A place where sessions live.
///
/// This is the interface shared by the in-memory, the expiring and the persistent session stores.
/// Stores compose: the expiring store wraps another store and adds a lifetime, the persistent
/// store wraps another store and mirrors its sessions into a durable record store.
///
/// All methods take the cookie value the client sent. Stores only keep its hash,
/// see [`SessionId`](crate::SessionId).
#[async_trait]
pub trait SessionBackend: Debug + Send + Sync {
    /// Create a session for `user_id` and return the cookie value identifying it.
    ///
    /// Returns `Ok(None)` if `user_id` is empty.
    async fn create_session(&self, user_id: &UserId) -> Result<Option<String>>;

    /// Read the session identified by `cookie_value`.
    ///
    /// Returns `Ok(None)` for unknown, malformed or expired sessions.
    async fn session_record(&self, cookie_value: &str) -> Result<Option<SessionRecord>>;

    /// Resolve the user logged in by `cookie_value`.
    async fn user_id_for_session_id(&self, cookie_value: &str) -> Result<Option<UserId>> {
        Ok(self
            .session_record(cookie_value)
            .await?
            .map(|record| record.user_id))
    }

    /// Destroy the session identified by `cookie_value`.
    ///
    /// Returns `Ok(false)` if there is no valid session to destroy.
    /// Destroyed cookie values are never handed out again.
    async fn destroy_session(&self, cookie_value: &str) -> Result<bool>;
}

/// The result of writing a session, indicating if the session could be written, or if the id collided.
#[derive(Debug, PartialEq, Eq)]
pub enum WriteSessionResult<OkData = ()> {
    /// The session could be written without id collision.
    Ok(OkData),
    /// The session could not be written, because the chosen id already exists.
    SessionIdExists,
}

impl<OkData> WriteSessionResult<OkData> {
    /// Map the data of a successful write.
    pub fn map<OtherOkData>(
        self,
        f: impl FnOnce(OkData) -> OtherOkData,
    ) -> WriteSessionResult<OtherOkData> {
        match self {
            Self::Ok(data) => WriteSessionResult::Ok(f(data)),
            Self::SessionIdExists => WriteSessionResult::SessionIdExists,
        }
    }
}
