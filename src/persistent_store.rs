//! Sessions that survive process restarts.
//!
//! [`PersistentSessions`] mirrors every session into a [`SessionRecordStore`] and, optionally,
//! into a JSON [`SnapshotFile`]. Lookups first reload the snapshot, so a session created before a
//! restart (or by another process sharing the file) is found again.
//!
//! # Consistency
//!
//! The snapshot is a whole-table dump. Within one process all snapshot reads and writes are
//! serialized. Several processes sharing one snapshot file race with each other, and the last
//! writer wins. Deployments with more than one process should rely on a shared record store and
//! run without a snapshot file.

use crate::clock::Clock;
use crate::session_store::{SessionBackend, WriteSessionResult, MAXIMUM_RETRIES_ON_ID_COLLISION};
use crate::{Error, Result, SessionId, SessionPolicy, SessionRecord, UserId};
use async_lock::{Mutex, RwLock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// The id of this record.
    pub id: String,
    /// The user this session logs in.
    pub user_id: UserId,
    /// The hashed session cookie.
    pub session_id: SessionId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// Durable storage of [`UserSession`] records.
///
/// Records are only ever written through [`PersistentSessions`].
#[async_trait]
pub trait SessionRecordStore: Debug + Send + Sync {
    /// Store a new record. Reports a collision if a record with the same session id exists.
    async fn save(&self, record: &UserSession) -> Result<WriteSessionResult>;

    /// Find the record of the given session.
    async fn search(&self, session_id: &SessionId) -> Result<Option<UserSession>>;

    /// Remove the record with the given record id. Returns false if there was none.
    async fn remove(&self, record_id: &str) -> Result<bool>;

    /// All stored records.
    async fn all(&self) -> Result<Vec<UserSession>>;

    /// Replace all stored records, e.g. when rehydrating from a snapshot.
    async fn replace_all(&self, records: Vec<UserSession>) -> Result;
}

/// A record store holding its table in memory. Pair it with a [`SnapshotFile`] for durability.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, UserSession>>,
}

/// A JSON file holding all session records, keyed by record id.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

/// A session store persisting its sessions.
///
/// `Inner` mints the session cookies, typically an [`ExpiringSessions`](crate::ExpiringSessions).
/// The minted entry is dropped from `Inner` as soon as its record is saved, so `Inner` holds no
/// sessions of its own. Validity is decided from the persisted records alone, using `policy` and
/// the persisted creation time.
///
/// Destroying an expired session reports `false`, but its record is deleted from the record
/// store and the snapshot all the same.
#[derive(Debug)]
pub struct PersistentSessions<Inner, Records = MemoryRecordStore> {
    inner: Inner,
    records: Records,
    snapshot: Option<SnapshotFile>,
    policy: SessionPolicy,
    clock: Arc<dyn Clock>,
    io_lock: Mutex<()>,
}

impl UserSession {
    /// A new record with a fresh record id.
    pub fn new(user_id: UserId, session_id: SessionId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            session_id,
            created_at,
        }
    }
}

impl From<UserSession> for SessionRecord {
    fn from(record: UserSession) -> Self {
        SessionRecord::new(record.user_id, record.created_at)
    }
}

#[async_trait]
impl SessionRecordStore for MemoryRecordStore {
    async fn save(&self, record: &UserSession) -> Result<WriteSessionResult> {
        let mut records = self.records.write().await;
        if records
            .values()
            .any(|existing| existing.session_id == record.session_id)
        {
            return Ok(WriteSessionResult::SessionIdExists);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(WriteSessionResult::Ok(()))
    }

    async fn search(&self, session_id: &SessionId) -> Result<Option<UserSession>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|record| &record.session_id == session_id)
            .cloned())
    }

    async fn remove(&self, record_id: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(record_id).is_some())
    }

    async fn all(&self) -> Result<Vec<UserSession>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn replace_all(&self, records: Vec<UserSession>) -> Result {
        *self.records.write().await = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Ok(())
    }
}

impl MemoryRecordStore {
    /// Create a new empty record store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if there are no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl SnapshotFile {
    /// A snapshot at `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The location of the snapshot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records. Returns `Ok(None)` if the file does not exist yet.
    pub fn load(&self) -> Result<Option<Vec<UserSession>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let records: BTreeMap<String, UserSession> = serde_json::from_str(&contents)?;
        Ok(Some(records.into_values().collect()))
    }

    /// Replace the file contents with `records`.
    /// The new contents are written next to the file first and then moved into place.
    pub fn write(&self, records: &[UserSession]) -> Result {
        let table: BTreeMap<&str, &UserSession> = records
            .iter()
            .map(|record| (record.id.as_str(), record))
            .collect();
        let contents = serde_json::to_string(&table)?;

        let mut temporary = self.path.clone().into_os_string();
        temporary.push(".tmp");
        fs::write(&temporary, contents)?;
        fs::rename(&temporary, &self.path)?;
        log::trace!(
            "Wrote {} session records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl<Inner: SessionBackend, Records: SessionRecordStore> PersistentSessions<Inner, Records> {
    /// Persist the sessions of `inner` into `records`, and into `snapshot` if given.
    pub fn new(
        inner: Inner,
        records: Records,
        snapshot: Option<SnapshotFile>,
        policy: SessionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            records,
            snapshot,
            policy,
            clock,
            io_lock: Mutex::new(()),
        }
    }

    /// The durable record store.
    pub fn records(&self) -> &Records {
        &self.records
    }

    /// The store minting the session cookies.
    pub fn inner(&self) -> &Inner {
        &self.inner
    }

    /// Delete all expired records and rewrite the snapshot.
    /// Returns the number of deleted records.
    pub async fn cleanup(&self) -> Result<usize> {
        let _guard = self.io_lock.lock().await;
        self.rehydrate().await?;
        let now = self.clock.now();
        let mut deleted = 0;
        for record in self.records.all().await? {
            if self.policy.is_expired(record.created_at, now)
                && self.records.remove(&record.id).await?
            {
                deleted += 1;
            }
        }
        self.write_snapshot().await?;
        log::trace!("Deleted {deleted} expired session records");
        Ok(deleted)
    }

    async fn rehydrate(&self) -> Result {
        if let Some(snapshot) = &self.snapshot {
            if let Some(records) = snapshot.load()? {
                self.records.replace_all(records).await?;
            }
        }
        Ok(())
    }

    async fn write_snapshot(&self) -> Result {
        if let Some(snapshot) = &self.snapshot {
            snapshot.write(&self.records.all().await?)?;
        }
        Ok(())
    }
}

#[async_trait]
impl<Inner: SessionBackend, Records: SessionRecordStore> SessionBackend
    for PersistentSessions<Inner, Records>
{
    async fn create_session(&self, user_id: &UserId) -> Result<Option<String>> {
        if user_id.is_empty() {
            return Ok(None);
        }

        let _guard = self.io_lock.lock().await;
        self.rehydrate().await?;
        for _ in 0..MAXIMUM_RETRIES_ON_ID_COLLISION {
            let Some(cookie_value) = self.inner.create_session(user_id).await? else {
                return Ok(None);
            };
            let record = UserSession::new(
                user_id.clone(),
                SessionId::from_cookie_value(&cookie_value),
                self.clock.now(),
            );
            let saved = self.records.save(&record).await?;
            self.inner.destroy_session(&cookie_value).await?;
            match saved {
                WriteSessionResult::Ok(()) => {
                    self.write_snapshot().await?;
                    log::debug!("Persisted session {} of user {user_id}", record.id);
                    return Ok(Some(cookie_value));
                }
                WriteSessionResult::SessionIdExists => {
                    log::debug!("Persisted session id already exists, retrying");
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

        let _guard = self.io_lock.lock().await;
        self.rehydrate().await?;
        let session_id = SessionId::from_cookie_value(cookie_value);
        let Some(record) = self.records.search(&session_id).await? else {
            return Ok(None);
        };
        if self.policy.is_expired(record.created_at, self.clock.now()) {
            log::debug!("Persisted session {} is expired", record.id);
            return Ok(None);
        }
        Ok(Some(record.into()))
    }

    /// Expired sessions cannot be destroyed, as there is no valid session anymore.
    /// Their records are dropped nonetheless.
    async fn destroy_session(&self, cookie_value: &str) -> Result<bool> {
        if cookie_value.is_empty() {
            return Ok(false);
        }

        let _guard = self.io_lock.lock().await;
        self.rehydrate().await?;
        let session_id = SessionId::from_cookie_value(cookie_value);
        let Some(record) = self.records.search(&session_id).await? else {
            return Ok(false);
        };
        let expired = self.policy.is_expired(record.created_at, self.clock.now());
        self.records.remove(&record.id).await?;
        self.write_snapshot().await?;
        log::debug!("Removed persisted session {} of user {}", record.id, record.user_id);
        Ok(!expired)
    }
}
