//! Authentication for web applications.
//!
//! This crate resolves the user an HTTP request acts for. It supports HTTP Basic authentication
//! and cookie based sessions, and hashes passwords with Argon2id.
//!
//! # Sessions
//!
//! Sessions live in a [`SessionBackend`]. Backends compose:
//!
//! * [`MemorySessions`] maps session cookies to users, in memory.
//! * [`ExpiringSessions`] wraps another backend and treats sessions older than a
//!   [`SessionPolicy`] allows as absent. Expiry is checked when a session is read.
//! * [`PersistentSessions`] wraps another backend and mirrors its sessions into a
//!   [`SessionRecordStore`] and a [`SnapshotFile`], so they survive restarts.
//!
//! Which authenticator and which backend are active is decided once at startup from an
//! [`AuthConfig`], see [`AuthBackend::from_config`].
//!
//! # Security
//!
//! Session cookies are 64 random alphanumeric characters. Stores only keep their blake3 hash.
//! Password digests are salted and verified in constant time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use http::header::COOKIE;
//! use http::{HeaderMap, HeaderValue};
//! use session_auth::{
//!     hash_password, Authenticator, ExpiringSessions, MemoryDirectory, MemorySessions,
//!     SessionAuth, SessionPolicy, SystemClock, UserDirectory,
//! };
//!
//! # fn main() -> session_auth::Result {
//! # async_std::task::block_on(async {
//! let clock = Arc::new(SystemClock);
//! let directory = Arc::new(MemoryDirectory::new());
//! let user = directory.create("a@b.com", hash_password("pw1")?).await?;
//!
//! // Sessions expire after one hour.
//! let sessions = ExpiringSessions::new(
//!     MemorySessions::new(clock.clone()),
//!     SessionPolicy::with_duration_secs(3600),
//!     clock,
//! );
//! let auth = SessionAuth::new(Box::new(sessions), directory, "_my_session_id");
//!
//! let cookie_value = auth.create_session(&user.id).await?.unwrap();
//! let mut headers = HeaderMap::new();
//! headers.insert(
//!     COOKIE,
//!     HeaderValue::from_str(&format!("_my_session_id={cookie_value}")).unwrap(),
//! );
//! assert_eq!(auth.current_user(&headers).await?.unwrap().email, "a@b.com");
//! #
//! # Ok::<(), session_auth::Error>(()) }) }
//! ```

#![forbid(unsafe_code)]
#![deny(future_incompatible, nonstandard_style)]
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub use error::Error;
/// A Result with this crate's [`Error`] and default return type of ()
pub type Result<T = ()> = std::result::Result<T, Error>;

mod auth;
mod clock;
mod config;
mod error;
mod expiring_store;
mod memory_store;
mod password;
mod persistent_store;
mod redact;
mod service;
mod session;
mod session_store;
mod user;
mod views;

pub use auth::{
    authenticate, extract_cookie, require_auth, AuthBackend, Authenticator, BasicAuth,
    GateOnlyAuth, SessionAuth, DEFAULT_EXCLUDED_PATHS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, AuthType, DEFAULT_SESSION_NAME, DEFAULT_SNAPSHOT_PATH};
pub use expiring_store::ExpiringSessions;
pub use memory_store::MemorySessions;
pub use password::{hash_password, verify_password, HashedPassword};
pub use persistent_store::{
    MemoryRecordStore, PersistentSessions, SessionRecordStore, SnapshotFile, UserSession,
};
pub use redact::{filter_datum, RedactingLogger, PII_FIELDS};
pub use service::UserAuthService;
pub use session::{SessionExpiry, SessionId, SessionIdType, SessionPolicy, SessionRecord};
pub use session_store::cookie_generator::{
    DebugSessionCookieGenerator, DefaultSessionCookieGenerator, SessionCookieGenerator,
};
pub use session_store::{SessionBackend, WriteSessionResult, MAXIMUM_RETRIES_ON_ID_COLLISION};
pub use user::{MemoryDirectory, User, UserDirectory, UserFilter, UserId, UserUpdate};
pub use views::{login_session, logout_session, LoginForm};
