//! Opaque location identity.
//!
//! Locations in the anticipation subsystem are addressed by an opaque
//! string key rather than a database id — the key is what the predictor,
//! the cache, and the collapse manager all agree on, and it is unique
//! only within a single game session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, session-unique identifier for a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LocationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for LocationKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for LocationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
