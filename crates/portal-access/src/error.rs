//! Error types for the access policy

use crate::tier::Tier;

/// Plan catalog validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// No plans defined
    #[error("plan catalog is empty")]
    Empty,

    /// Free tier missing
    #[error("plan catalog has no tier 0 plan")]
    MissingFreeTier,

    /// Tiers must be strictly ascending
    #[error("plan tiers out of order: {previous} followed by {next}")]
    OutOfOrder {
        /// Tier seen first
        previous: Tier,
        /// Tier that should have been greater
        next: Tier,
    },

    /// Plan without a display name
    #[error("plan for tier {0} has an empty name")]
    UnnamedPlan(Tier),
}
