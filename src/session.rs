use crate::user::UserId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The type of a session id.
pub type SessionIdType = [u8; blake3::OUT_LEN];

/// A session id.
///
/// Session stores never see the cookie value handed to the client, only its blake3 hash.
/// A leaked store (or snapshot file) therefore does not leak usable session cookies.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SessionId(Box<SessionIdType>);

/// What a session store keeps per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The user this session logs in.
    pub user_id: UserId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// The expiry of a session.
/// Either a given date and time, or never.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SessionExpiry {
    /// The session expires at the given date and time.
    DateTime(DateTime<Utc>),
    /// The session never expires, unless it is explicitly deleted.
    Never,
}

/// The lifetime rule applied to sessions.
///
/// A session older than the configured duration is treated as absent.
/// Expiry is evaluated when a session is read; nothing is evicted in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPolicy {
    duration: Option<Duration>,
}

impl SessionId {
    /// Applies a cryptographic hash function on a cookie value to obtain the session id for that cookie.
    ///
    /// This is automatically done by the session stores, and this function is only public for test purposes.
    pub fn from_cookie_value(cookie_value: &str) -> Self {
        let hash = blake3::hash(cookie_value.as_bytes());
        Self(Box::new(hash.into()))
    }
}

impl From<SessionId> for SessionIdType {
    fn from(id: SessionId) -> Self {
        *id.0
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SessionId {
    type Error = blake3::HexError;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        let hash = blake3::Hash::from_hex(hex)?;
        Ok(Self(Box::new(hash.into())))
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", blake3::Hash::from(*self.0).to_hex())
    }
}

impl Debug for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({self})")
    }
}

impl SessionRecord {
    /// A record for `user_id`, created at `created_at`.
    pub fn new(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            created_at,
        }
    }
}

impl SessionPolicy {
    /// Sessions live until they are destroyed.
    pub fn never_expire() -> Self {
        Self { duration: None }
    }

    /// Sessions expire `seconds` after their creation.
    /// Zero or negative values mean that sessions never expire.
    pub fn with_duration_secs(seconds: i64) -> Self {
        if seconds <= 0 {
            return Self::never_expire();
        }
        Self {
            duration: Duration::try_seconds(seconds),
        }
    }

    /// Interpret a configured session duration.
    ///
    /// Absent or non-numeric values fall back to "never expires".
    pub fn from_setting(setting: Option<&str>) -> Self {
        Self::with_duration_secs(parse_duration_secs(setting))
    }

    /// The configured duration, if sessions expire at all.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// The expiry of a session created at `created_at`.
    pub fn expiry(&self, created_at: DateTime<Utc>) -> SessionExpiry {
        match self
            .duration
            .and_then(|duration| created_at.checked_add_signed(duration))
        {
            Some(expiry) => SessionExpiry::DateTime(expiry),
            None => SessionExpiry::Never,
        }
    }

    /// Return true if a session created at `created_at` is expired at `now`.
    /// A session is still valid at the exact instant of its expiry.
    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.expiry(created_at) {
            SessionExpiry::DateTime(expiry) => expiry < now,
            SessionExpiry::Never => false,
        }
    }
}

/// Parse a session duration in seconds.
///
/// Anything that is not an integer is read as 0, i.e. "never expires".
pub(crate) fn parse_duration_secs(setting: Option<&str>) -> i64 {
    let Some(setting) = setting else {
        return 0;
    };
    match setting.trim().parse() {
        Ok(seconds) => seconds,
        Err(_) => {
            log::warn!("Session duration {setting:?} is not a number, sessions will never expire");
            0
        }
    }
}
