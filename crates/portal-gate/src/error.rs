//! Error types for the subscription gate

use portal_account::AccountError;

/// Upgrade failures surfaced by the gate
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateError {
    /// No signed-in identity, nothing was written
    #[error("upgrade requires a signed-in account")]
    Unauthenticated,

    /// A previous upgrade from this gate has not finished
    #[error("an upgrade is already in progress")]
    UpgradeInFlight,

    /// Gate was unmounted before the call
    #[error("gate is no longer mounted")]
    Unmounted,

    /// Plan write failed
    #[error("plan update failed: {0}")]
    Store(#[from] AccountError),
}

impl GateError {
    /// Check if the user can simply try again
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::UpgradeInFlight => true,
            Self::Unauthenticated | Self::Unmounted => false,
        }
    }

    /// Message shown inline on the blocked view
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please sign in to upgrade your plan.".to_string(),
            Self::UpgradeInFlight => "Your upgrade is still being processed.".to_string(),
            Self::Unmounted => String::new(),
            Self::Store(e) if e.is_retryable() => {
                "We couldn't reach the server. Please try again.".to_string()
            }
            Self::Store(_) => "Your plan could not be updated. Please try again.".to_string(),
        }
    }
}
