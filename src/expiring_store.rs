use crate::clock::Clock;
use crate::session_store::SessionBackend;
use crate::{MemorySessions, Result, SessionPolicy, SessionRecord, UserId};
use async_trait::async_trait;
use std::sync::Arc;

/// A session store that gives sessions a lifetime.
///
/// Sessions are minted by the wrapped store. When read, a session older than the
/// [`SessionPolicy`] allows is reported as absent, even though the wrapped store still holds it.
/// It stays there until it is destroyed or cleaned up.
#[derive(Debug)]
pub struct ExpiringSessions<Inner> {
    inner: Inner,
    policy: SessionPolicy,
    clock: Arc<dyn Clock>,
}

impl<Inner: SessionBackend> ExpiringSessions<Inner> {
    /// Wrap `inner`, expiring its sessions according to `policy`.
    pub fn new(inner: Inner, policy: SessionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            policy,
            clock,
        }
    }

    /// The lifetime rule of this store.
    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Inner {
        &self.inner
    }

    fn is_expired(&self, record: &SessionRecord) -> bool {
        self.policy.is_expired(record.created_at, self.clock.now())
    }
}

impl<Generator> ExpiringSessions<MemorySessions<Generator>> {
    /// Delete all expired sessions from the wrapped memory store.
    pub async fn cleanup(&self) -> usize {
        self.inner.cleanup(self.policy).await
    }
}

#[async_trait]
impl<Inner: SessionBackend> SessionBackend for ExpiringSessions<Inner> {
    async fn create_session(&self, user_id: &UserId) -> Result<Option<String>> {
        self.inner.create_session(user_id).await
    }

    async fn session_record(&self, cookie_value: &str) -> Result<Option<SessionRecord>> {
        let Some(record) = self.inner.session_record(cookie_value).await? else {
            return Ok(None);
        };
        if self.is_expired(&record) {
            log::debug!("Session of user {} is expired", record.user_id);
            Ok(None)
        } else {
            Ok(Some(record))
        }
    }

    /// Expired sessions cannot be destroyed, as there is no valid session anymore.
    /// Their records are dropped from the wrapped store nonetheless.
    async fn destroy_session(&self, cookie_value: &str) -> Result<bool> {
        let Some(record) = self.inner.session_record(cookie_value).await? else {
            return Ok(false);
        };
        let destroyed = self.inner.destroy_session(cookie_value).await?;
        Ok(destroyed && !self.is_expired(&record))
    }
}
