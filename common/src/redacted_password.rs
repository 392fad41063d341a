//! Dashboard password handling with redacted Debug output.

use crate::{ErrorLocation, SecretError};

use std::fmt;
use std::panic::Location;

use serde::ser::Error;
use zeroize::Zeroize;

/// A dashboard password that never exposes its value in logs or debug output.
#[derive(Clone)]
pub struct RedactedPassword {
    inner: String,
}

impl RedactedPassword {
    pub fn new(password: String) -> Self {
        Self { inner: password }
    }

    /// Get the actual password for the login form.
    ///
    /// # Security Note
    /// Only call this when actually building the login request.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Get the password length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedPassword([REDACTED])")
    }
}

impl fmt::Display for RedactedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED PASSWORD]")
    }
}

impl Drop for RedactedPassword {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Prevent accidental serialization
impl serde::Serialize for RedactedPassword {
    #[track_caller]
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(SecretError::Disclosure {
            secret: "RedactedPassword",
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
