//! Access decisions
//!
//! A [`GateDecision`] is derived on every render from the account's plan and
//! the page's [`FeatureRequirement`]. Nothing here is cached or persisted.

use crate::tier::{normalize_tier, PlanValue, Tier};
use serde::{Deserialize, Serialize};

/// Feature name paired with the tier that unlocks it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRequirement {
    /// Display name of the feature
    pub feature_name: String,
    /// Minimum tier
    pub required_tier: Tier,
}

impl FeatureRequirement {
    /// Create new requirement
    #[inline]
    #[must_use]
    pub fn new(feature_name: impl Into<String>, required_tier: Tier) -> Self {
        Self {
            feature_name: feature_name.into(),
            required_tier,
        }
    }

    /// Evaluate a raw plan against this requirement
    #[inline]
    #[must_use]
    pub fn evaluate(&self, plan: &PlanValue) -> GateDecision {
        evaluate_access(plan, self.required_tier)
    }
}

/// Access verdict for one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Whether the current tier unlocks the feature
    pub has_access: bool,
    /// Normalized tier of the account
    pub current_tier: Tier,
    /// Tier the feature asks for
    pub required_tier: Tier,
}

impl GateDecision {
    /// Levels still missing to reach the required tier
    #[inline]
    #[must_use]
    pub fn shortfall(&self) -> u32 {
        self.required_tier.0.saturating_sub(self.current_tier.0)
    }
}

/// Decide whether `plan` unlocks a feature needing `required_tier`
#[must_use]
pub fn evaluate_access(plan: &PlanValue, required_tier: Tier) -> GateDecision {
    let current_tier = normalize_tier(plan);
    GateDecision {
        has_access: current_tier >= required_tier,
        current_tier,
        required_tier,
    }
}

/// Every tier strictly above `current`, ascending
///
/// `all_tiers` does not need to be sorted or unique.
#[must_use]
pub fn available_upgrade_tiers(current: Tier, all_tiers: &[Tier]) -> Vec<Tier> {
    let mut offers: Vec<Tier> = all_tiers.iter().copied().filter(|t| *t > current).collect();
    offers.sort_unstable();
    offers.dedup();
    offers
}
