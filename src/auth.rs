//! Request authentication.
//!
//! One [`Authenticator`] is active per process. Which one is decided once at startup from the
//! [`AuthConfig`], see [`AuthBackend::from_config`].

use crate::clock::Clock;
use crate::config::{AuthConfig, AuthType, DEFAULT_SNAPSHOT_PATH};
use crate::session_store::SessionBackend;
use crate::user::{User, UserDirectory, UserFilter, UserId};
use crate::{
    ExpiringSessions, MemoryRecordStore, MemorySessions, PersistentSessions, Result, SnapshotFile,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use glob::Pattern;
use http::header::{AUTHORIZATION, COOKIE};
use http::{HeaderMap, StatusCode};
use std::fmt::Debug;
use std::sync::Arc;

/// The paths reachable without credentials when nothing else is configured.
pub const DEFAULT_EXCLUDED_PATHS: [&str; 4] = [
    "/api/v1/status/",
    "/api/v1/unauthorized/",
    "/api/v1/forbidden/",
    "/api/v1/auth_session/login/",
];

/// Resolves the user a request acts for.
#[async_trait]
pub trait Authenticator: Debug + Send + Sync {
    /// Returns true unless `path` matches one of `excluded_paths`.
    /// See [`require_auth`].
    fn require_auth(&self, path: Option<&str>, excluded_paths: &[String]) -> bool {
        require_auth(path, excluded_paths)
    }

    /// The raw `Authorization` header, if present and valid UTF-8.
    fn authorization_header<'headers>(
        &self,
        headers: &'headers HeaderMap,
    ) -> Option<&'headers str> {
        headers.get(AUTHORIZATION)?.to_str().ok()
    }

    /// The name of the session cookie, for authenticators that use one.
    fn session_name(&self) -> Option<&str> {
        None
    }

    /// The value of the session cookie, if present.
    fn session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        extract_cookie(headers, self.session_name()?)
    }

    /// The user the request acts for.
    ///
    /// Missing, malformed or invalid credentials all yield `Ok(None)`.
    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>>;
}

/// Checks that credentials are present, but never resolves a user.
/// Every request to a protected path is therefore forbidden.
#[derive(Debug, Default, Clone, Copy)]
pub struct GateOnlyAuth;

/// HTTP Basic authentication against a user directory.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    directory: Arc<dyn UserDirectory>,
}

/// Cookie based session authentication on top of a [`SessionBackend`].
#[derive(Debug)]
pub struct SessionAuth {
    backend: Box<dyn SessionBackend>,
    directory: Arc<dyn UserDirectory>,
    session_name: String,
}

/// The authenticator selected by configuration.
#[derive(Debug)]
pub enum AuthBackend {
    /// See [`GateOnlyAuth`].
    GateOnly(GateOnlyAuth),
    /// See [`BasicAuth`].
    Basic(BasicAuth),
    /// See [`SessionAuth`].
    Session(SessionAuth),
}

/// Returns true (authentication required) unless `path` matches one of `excluded_paths`.
///
/// A trailing slash is appended to `path` before matching. Excluded paths are shell-style
/// wildcard patterns, e.g. `/api/v1/stat*`. Without a path or without excluded paths,
/// authentication is always required.
pub fn require_auth(path: Option<&str>, excluded_paths: &[String]) -> bool {
    let Some(path) = path.filter(|path| !path.is_empty()) else {
        return true;
    };
    if excluded_paths.is_empty() {
        return true;
    }

    let path = if path.ends_with('/') {
        path.to_owned()
    } else {
        format!("{path}/")
    };
    !excluded_paths.iter().any(|excluded| match Pattern::new(excluded) {
        Ok(pattern) => pattern.matches(&path),
        Err(_) => excluded == &path,
    })
}

/// Extract a cookie value from headers.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
}

/// The before-request gate of the hosting application.
///
/// Resolves the current user. For paths that require authentication, a request without any
/// credentials is rejected with 401 and a request whose credentials do not resolve to a user
/// is rejected with 403. Why a user could not be resolved is never revealed.
pub async fn authenticate(
    auth: &dyn Authenticator,
    path: &str,
    excluded_paths: &[String],
    headers: &HeaderMap,
) -> std::result::Result<Option<User>, StatusCode> {
    let user = match auth.current_user(headers).await {
        Ok(user) => user,
        Err(error) => {
            log::error!("Resolving the current user failed: {error}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    if !auth.require_auth(Some(path), excluded_paths) {
        return Ok(user);
    }
    if auth.authorization_header(headers).is_none() && auth.session_cookie(headers).is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    match user {
        Some(user) => Ok(Some(user)),
        None => Err(StatusCode::FORBIDDEN),
    }
}

#[async_trait]
impl Authenticator for GateOnlyAuth {
    async fn current_user(&self, _headers: &HeaderMap) -> Result<Option<User>> {
        Ok(None)
    }
}

impl BasicAuth {
    /// Authenticate against the users of `directory`.
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// The base64 part of a `Basic` authorization header.
    pub fn extract_base64_authorization_header<'header>(
        &self,
        authorization_header: &'header str,
    ) -> Option<&'header str> {
        authorization_header.strip_prefix("Basic ")
    }

    /// Decode the base64 part of an authorization header into a UTF-8 string.
    pub fn decode_base64_authorization_header(&self, encoded: &str) -> Option<String> {
        let decoded = STANDARD.decode(encoded).ok()?;
        String::from_utf8(decoded).ok()
    }

    /// Split decoded credentials into email and password at the first colon.
    /// The password itself may contain colons.
    pub fn extract_user_credentials<'credentials>(
        &self,
        decoded: &'credentials str,
    ) -> Option<(&'credentials str, &'credentials str)> {
        decoded.split_once(':')
    }

    /// The user with the given email, if `password` is theirs.
    pub async fn user_object_from_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>> {
        if email.is_empty() || password.is_empty() {
            return Ok(None);
        }
        let user = self
            .directory
            .find(&UserFilter::Email(email.to_owned()))
            .await?;
        Ok(user.filter(|user| user.is_valid_password(password)))
    }
}

#[async_trait]
impl Authenticator for BasicAuth {
    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>> {
        let Some((email, password)) = self
            .authorization_header(headers)
            .and_then(|header| self.extract_base64_authorization_header(header))
            .and_then(|encoded| self.decode_base64_authorization_header(encoded))
            .and_then(|decoded| {
                self.extract_user_credentials(&decoded)
                    .map(|(email, password)| (email.to_owned(), password.to_owned()))
            })
        else {
            return Ok(None);
        };
        self.user_object_from_credentials(&email, &password).await
    }
}

impl SessionAuth {
    /// Authenticate by the cookie `session_name`, looking sessions up in `backend`.
    pub fn new(
        backend: Box<dyn SessionBackend>,
        directory: Arc<dyn UserDirectory>,
        session_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            directory,
            session_name: session_name.into(),
        }
    }

    /// The session store.
    pub fn backend(&self) -> &dyn SessionBackend {
        self.backend.as_ref()
    }

    /// The user directory.
    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Create a session for `user_id`, returning the cookie value to hand to the client.
    pub async fn create_session(&self, user_id: &UserId) -> Result<Option<String>> {
        self.backend.create_session(user_id).await
    }

    /// Resolve a session cookie value to the id of its user.
    pub async fn user_id_for_session_id(&self, cookie_value: &str) -> Result<Option<UserId>> {
        self.backend.user_id_for_session_id(cookie_value).await
    }

    /// Destroy the session the request carries.
    /// Returns false if the request carries no session cookie or the session is unknown.
    pub async fn destroy_session(&self, headers: &HeaderMap) -> Result<bool> {
        let Some(cookie_value) = self.session_cookie(headers) else {
            return Ok(false);
        };
        self.backend.destroy_session(&cookie_value).await
    }
}

#[async_trait]
impl Authenticator for SessionAuth {
    fn session_name(&self) -> Option<&str> {
        Some(&self.session_name)
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>> {
        let Some(cookie_value) = self.session_cookie(headers) else {
            return Ok(None);
        };
        let Some(user_id) = self.backend.user_id_for_session_id(&cookie_value).await? else {
            return Ok(None);
        };
        self.directory.find(&UserFilter::Id(user_id)).await
    }
}

impl AuthBackend {
    /// Build the authenticator `config` selects.
    /// Returns `None` if no authentication is configured.
    pub fn from_config(
        config: &AuthConfig,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Option<Self> {
        let auth_type = config.auth_type?;
        log::info!("Using {auth_type:?} authentication");
        let policy = config.session_policy();
        let backend: Box<dyn SessionBackend> = match auth_type {
            AuthType::Auth => return Some(Self::GateOnly(GateOnlyAuth)),
            AuthType::BasicAuth => return Some(Self::Basic(BasicAuth::new(directory))),
            AuthType::SessionAuth => Box::new(MemorySessions::new(clock)),
            AuthType::SessionExpAuth => Box::new(ExpiringSessions::new(
                MemorySessions::new(clock.clone()),
                policy,
                clock,
            )),
            AuthType::SessionDbAuth => {
                let path = config
                    .snapshot_path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.into());
                Box::new(PersistentSessions::new(
                    ExpiringSessions::new(
                        MemorySessions::new(clock.clone()),
                        policy,
                        clock.clone(),
                    ),
                    MemoryRecordStore::new(),
                    Some(SnapshotFile::new(path)),
                    policy,
                    clock,
                ))
            }
        };
        Some(Self::Session(SessionAuth::new(
            backend,
            directory,
            config.session_name.clone(),
        )))
    }

    /// The session authenticator, if sessions are in use.
    pub fn as_session(&self) -> Option<&SessionAuth> {
        match self {
            Self::Session(auth) => Some(auth),
            Self::GateOnly(_) | Self::Basic(_) => None,
        }
    }

    fn authenticator(&self) -> &dyn Authenticator {
        match self {
            Self::GateOnly(auth) => auth,
            Self::Basic(auth) => auth,
            Self::Session(auth) => auth,
        }
    }
}

#[async_trait]
impl Authenticator for AuthBackend {
    fn require_auth(&self, path: Option<&str>, excluded_paths: &[String]) -> bool {
        self.authenticator().require_auth(path, excluded_paths)
    }

    fn session_name(&self) -> Option<&str> {
        self.authenticator().session_name()
    }

    async fn current_user(&self, headers: &HeaderMap) -> Result<Option<User>> {
        self.authenticator().current_user(headers).await
    }
}
