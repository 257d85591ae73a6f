//! Startup configuration.
//!
//! The configuration is read once, either from the environment ([`AuthConfig::from_env`]) or
//! from a JSON file ([`AuthConfig::load`]).

use crate::auth::DEFAULT_EXCLUDED_PATHS;
use crate::session::parse_duration_secs;
use crate::{Error, Result, SessionPolicy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where [`PersistentSessions`](crate::PersistentSessions) keeps its snapshot unless configured otherwise.
pub const DEFAULT_SNAPSHOT_PATH: &str = ".db_UserSession.json";

/// The session cookie name unless configured otherwise.
pub const DEFAULT_SESSION_NAME: &str = "_my_session_id";

/// Selects the active authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Require credentials, but never accept any.
    Auth,
    /// HTTP Basic authentication.
    BasicAuth,
    /// In-memory sessions without expiry.
    SessionAuth,
    /// In-memory sessions with expiry.
    SessionExpAuth,
    /// Persisted sessions with expiry.
    SessionDbAuth,
}

/// Authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The active authenticator. `None` disables authentication.
    pub auth_type: Option<AuthType>,
    /// The name of the session cookie.
    pub session_name: String,
    /// Session lifetime in seconds. Zero, negative or non-numeric values mean sessions never expire.
    #[serde(deserialize_with = "lenient_duration_secs")]
    pub session_duration: i64,
    /// Location of the session snapshot file of persisted sessions.
    pub snapshot_path: Option<PathBuf>,
    /// Paths that do not require authentication. Shell-style wildcards are allowed.
    pub excluded_paths: Vec<String>,
}

impl AuthType {
    /// The configuration name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::BasicAuth => "basic_auth",
            Self::SessionAuth => "session_auth",
            Self::SessionExpAuth => "session_exp_auth",
            Self::SessionDbAuth => "session_db_auth",
        }
    }
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "auth" => Ok(Self::Auth),
            "basic_auth" => Ok(Self::BasicAuth),
            "session_auth" => Ok(Self::SessionAuth),
            "session_exp_auth" => Ok(Self::SessionExpAuth),
            "session_db_auth" => Ok(Self::SessionDbAuth),
            other => Err(Error::Configuration(format!("unknown AUTH_TYPE {other:?}"))),
        }
    }
}

impl Display for AuthType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_type: None,
            session_name: DEFAULT_SESSION_NAME.to_owned(),
            session_duration: 0,
            snapshot_path: None,
            excluded_paths: DEFAULT_EXCLUDED_PATHS.map(String::from).to_vec(),
        }
    }
}

impl AuthConfig {
    /// Read `AUTH_TYPE`, `SESSION_NAME`, `SESSION_DURATION` and `SESSION_SNAPSHOT_PATH` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Read the configuration from the given environment-style variables.
    /// Unknown variables are ignored.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "AUTH_TYPE" if value.is_empty() => {}
                "AUTH_TYPE" => config.auth_type = Some(value.parse()?),
                "SESSION_NAME" if !value.is_empty() => config.session_name = value,
                "SESSION_DURATION" => config.session_duration = parse_duration_secs(Some(&value)),
                "SESSION_SNAPSHOT_PATH" if !value.is_empty() => {
                    config.snapshot_path = Some(value.into())
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Read the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// The session lifetime rule.
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy::with_duration_secs(self.session_duration)
    }
}

/// Accept a number or a numeric string. Anything else means "never expires".
fn lenient_duration_secs<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(number) => number.as_i64().unwrap_or_else(|| {
            log::warn!("Session duration {number} is not an integer, sessions will never expire");
            0
        }),
        serde_json::Value::String(text) => parse_duration_secs(Some(&text)),
        serde_json::Value::Null => 0,
        other => {
            log::warn!("Session duration {other} is not a number, sessions will never expire");
            0
        }
    })
}
