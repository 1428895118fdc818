//! Core types for the account layer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Raw document as stored in the document database
pub type Document = Map<String, Value>;

/// Collection holding one account record per identity
pub const USERS_COLLECTION: &str = "users";

/// Stored field names
pub mod fields {
    //! Field names of the account record
    /// Contact email
    pub const EMAIL: &str = "email";
    /// Display name
    pub const DISPLAY_NAME: &str = "displayName";
    /// Avatar URL
    pub const PHOTO_URL: &str = "photoURL";
    /// Administrator flag
    pub const IS_ADMIN: &str = "isAdmin";
    /// Raw plan value
    pub const PLAN: &str = "plan";
    /// First name
    pub const NAME: &str = "name";
    /// Surname
    pub const SURNAME: &str = "surname";
    /// Gender
    pub const GENDER: &str = "gender";
    /// Date of birth
    pub const DOB: &str = "dob";
    /// Last sign-in timestamp
    pub const LAST_LOGIN: &str = "lastLogin";
    /// Last profile edit timestamp
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Auth subject key, also the account document id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Create identity from subject
    #[inline]
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    /// Get subject string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Profile the auth provider reports for a signed-in identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProfile {
    /// Subject key
    pub identity: Identity,
    /// Sign-in email
    pub email: Option<String>,
    /// Provider display name
    pub display_name: Option<String>,
    /// Provider avatar
    pub photo_url: Option<String>,
}

impl AuthProfile {
    /// Create profile with only an identity
    #[inline]
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(identity),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    /// With email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Account snapshot cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached accounts
    pub max_capacity: u64,
    /// Seconds before a cached snapshot is refetched
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With capacity
    #[inline]
    #[must_use]
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// With time to live
    #[inline]
    #[must_use]
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Time to live as a duration
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl_secs: 300,
        }
    }
}
