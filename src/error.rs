/// All errors that can occur in this crate.
///
/// Lookups that simply find nothing (an unknown cookie, an expired session, a malformed
/// `Authorization` header) are not errors. They are reported as `None` or `false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A user with the given email is already registered.
    #[error("user {email} already exists")]
    UserAlreadyExists {
        /// The email that was attempted to be registered.
        email: String,
    },

    /// A reset token was requested or redeemed for an unknown email or token.
    /// Which one of the two was unknown is deliberately not reported.
    #[error("invalid password reset request")]
    InvalidResetRequest,

    /// A user record was attempted to be updated, but it does not exist.
    #[error("no user with id {id} exists")]
    UserNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// Tried as often as desired to generate a session id, but all generated ids already exist.
    #[error("the maximum number of retries to generate a session id was reached")]
    MaximumSessionIdGenerationTriesReached {
        /// The maximum number of retries that was reached.
        maximum: u32,
    },

    /// Hashing a password failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// The configuration could not be interpreted.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Reading or writing the session snapshot file failed.
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The session snapshot or the configuration file could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An HTTP response could not be built.
    #[error("{0}")]
    Http(#[from] http::Error),

    /// An error occurred in a user directory or session record store implementation.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

mod expect_impl_error {
    trait ExpectImplError: std::error::Error + Send + Sync + 'static {}

    impl ExpectImplError for super::Error {}
}
