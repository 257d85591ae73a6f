use crate::clock::Clock;
use crate::session_store::cookie_generator::{
    DefaultSessionCookieGenerator, SessionCookieGenerator,
};
use crate::session_store::{SessionBackend, WriteSessionResult, MAXIMUM_RETRIES_ON_ID_COLLISION};
use crate::{Error, Result, SessionId, SessionPolicy, SessionRecord, UserId};
use async_lock::RwLock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// # in-memory session store
/// Because there is no external
/// persistence, this session store is ephemeral and will be cleared
/// on server restart.
///
/// # ***READ THIS BEFORE USING IN A PRODUCTION DEPLOYMENT***
///
/// Storing sessions only in memory brings the following problems:
///
/// 1. All sessions must fit in available memory (important for high load services)
/// 2. Sessions stored in memory are cleared only if a client logs out or [MemorySessions::cleanup] is called.
///    If sessions are not cleaned up properly it might result in OOM
/// 3. All sessions will be lost on shutdown
/// 4. If the service is clustered particular session will be stored only on a single instance.
///    This might be solved by using load balancers with sticky sessions.
///
/// Wrap it in an [`ExpiringSessions`](crate::ExpiringSessions) to give sessions a lifetime,
/// or in a [`PersistentSessions`](crate::PersistentSessions) to survive restarts.
#[derive(Debug)]
pub struct MemorySessions<Generator = DefaultSessionCookieGenerator> {
    session_map: RwLock<HashMap<SessionId, SessionRecord>>,
    cookie_generator: Generator,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl<Generator: SessionCookieGenerator> SessionBackend for MemorySessions<Generator> {
    async fn create_session(&self, user_id: &UserId) -> Result<Option<String>> {
        if user_id.is_empty() {
            return Ok(None);
        }

        for _ in 0..MAXIMUM_RETRIES_ON_ID_COLLISION {
            let cookie_value = self.cookie_generator.generate_cookie();
            let record = SessionRecord::new(user_id.clone(), self.clock.now());
            match self
                .try_insert(SessionId::from_cookie_value(&cookie_value), record)
                .await
                .map(|()| cookie_value)
            {
                WriteSessionResult::Ok(cookie_value) => {
                    log::debug!("Created session for user {user_id}");
                    return Ok(Some(cookie_value));
                }
                WriteSessionResult::SessionIdExists => {
                    log::debug!("Generated session id already exists, retrying");
                }
            }
        }

        Err(Error::MaximumSessionIdGenerationTriesReached {
            maximum: MAXIMUM_RETRIES_ON_ID_COLLISION,
        })
    }

    async fn session_record(&self, cookie_value: &str) -> Result<Option<SessionRecord>> {
        if cookie_value.is_empty() {
            return Ok(None);
        }
        let id = SessionId::from_cookie_value(cookie_value);
        Ok(self.session_map.read().await.get(&id).cloned())
    }

    async fn destroy_session(&self, cookie_value: &str) -> Result<bool> {
        if cookie_value.is_empty() {
            return Ok(false);
        }
        let id = SessionId::from_cookie_value(cookie_value);
        let removed = self.session_map.write().await.remove(&id);
        if let Some(record) = &removed {
            log::debug!("Destroyed session of user {}", record.user_id);
        }
        Ok(removed.is_some())
    }
}

impl MemorySessions {
    /// Create a new empty memory store generating secure random cookies.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::new_with_cookie_generator(DefaultSessionCookieGenerator::default(), clock)
    }
}

impl<Generator> MemorySessions<Generator> {
    /// Create a new empty memory store with a custom cookie generator.
    pub fn new_with_cookie_generator(cookie_generator: Generator, clock: Arc<dyn Clock>) -> Self {
        Self {
            session_map: Default::default(),
            cookie_generator,
            clock,
        }
    }

    /// Returns the number of sessions in the memory store, including expired ones.
    pub async fn len(&self) -> usize {
        self.session_map.read().await.len()
    }

    /// Returns true if the memory store is empty.
    pub async fn is_empty(&self) -> bool {
        self.session_map.read().await.is_empty()
    }

    /// Performs session cleanup, deleting all sessions that are expired under `policy`.
    /// This should be run on an intermittent basis if this store is run for long enough that
    /// memory accumulation is a concern.
    ///
    /// Returns the number of deleted sessions.
    pub async fn cleanup(&self, policy: SessionPolicy) -> usize {
        log::trace!("Cleaning up memory store...");
        let now = self.clock.now();
        let mut session_map = self.session_map.write().await;
        let initial_len = session_map.len();
        session_map.retain(|_, record| !policy.is_expired(record.created_at, now));
        let deleted = initial_len - session_map.len();
        log::trace!("Deleted {deleted} expired sessions");
        deleted
    }

    async fn try_insert(&self, id: SessionId, record: SessionRecord) -> WriteSessionResult {
        let mut session_map = self.session_map.write().await;
        // replace with `try_insert` once stable #82766
        if session_map.contains_key(&id) {
            WriteSessionResult::SessionIdExists
        } else {
            session_map.insert(id, record);
            WriteSessionResult::Ok(())
        }
    }
}
