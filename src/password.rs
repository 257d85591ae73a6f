//! Salted one-way password digests.

use crate::{Error, Result};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// A password digest in PHC string format.
///
/// Two digests of the same password differ, because each carries its own random salt.
/// Never compare digests with `==`; use [`HashedPassword::verify`] instead.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap a digest loaded from storage.
    pub fn from_phc_string(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// The PHC string, e.g. for persisting it.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true iff `password` was the source of this digest.
    pub fn verify(&self, password: &str) -> bool {
        verify_password(self, password)
    }
}

impl Debug for HashedPassword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword([REDACTED])")
    }
}

/// Hash `password` with Argon2id and a fresh 128 bit salt.
pub fn hash_password(password: &str) -> Result<HashedPassword> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|error| Error::PasswordHash(error.to_string()))?;
    Ok(HashedPassword(hash.to_string()))
}

/// Returns true iff `password` was the source of `digest`.
///
/// The comparison of the derived key runs in constant time.
/// A malformed digest never matches.
pub fn verify_password(digest: &HashedPassword, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(&digest.0) else {
        log::debug!("Rejecting malformed password digest");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
