//! API credentials.

use std::fmt;

/// The API key and token pair sent with every request.
///
/// Immutable once built. `Debug` never prints either value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    token: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            token: token.into(),
        }
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    /// Values that must never appear in logs or error messages.
    pub(crate) fn secrets(&self) -> [&str; 2] {
        [self.api_key.as_str(), self.token.as_str()]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
