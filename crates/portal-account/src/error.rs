//! Error types for the account layer
//!
//! Provides error handling for:
//! - Document store reads and writes
//! - Auth provider session changes
//! - Account-level rules (admin checks, entitlement re-checks)
//! - Funding application submission and review

use crate::funding::ApplicationStatus;
use crate::types::Identity;
use portal_access::Tier;

/// Document store failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable or timed out
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Document does not exist
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
    },

    /// Document shape rejected by the backend
    #[error("invalid document {collection}/{id}: {message}")]
    InvalidDocument {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
        /// Backend message
        message: String,
    },
}

impl StoreError {
    /// Create not found error
    #[inline]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Check if the same call may succeed later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Auth provider failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// No signed-in identity
    #[error("not signed in")]
    NotSignedIn,

    /// Provider rejected the request
    #[error("auth provider error: {0}")]
    Provider(String),
}

/// Account layer errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    /// Store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Auth operation failed
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// No account record for identity
    #[error("account not found: {0}")]
    NotFound(Identity),

    /// Acting identity is not an administrator
    #[error("{0} is not an administrator")]
    Forbidden(Identity),

    /// Account tier below what the feature needs
    #[error("{feature} requires tier {required}, account is on tier {current}")]
    Entitlement {
        /// Feature name
        feature: String,
        /// Required tier
        required: Tier,
        /// Tier found on the account
        current: Tier,
    },

    /// Application form rejected before it reached the store
    #[error("invalid application: {0}")]
    InvalidApplication(String),

    /// No funding application with this id
    #[error("funding application not found: {0}")]
    ApplicationNotFound(String),

    /// Final decisions must explain themselves
    #[error("feedback is required to mark an application {0}")]
    FeedbackRequired(ApplicationStatus),

    /// Review would move the application somewhere it cannot go
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: ApplicationStatus,
        /// Requested status
        to: ApplicationStatus,
    },
}

impl AccountError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}
