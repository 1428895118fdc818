//! Gate inputs, views and events

use portal_access::{FeatureRequirement, PlanDefinition, PlanValue, Tier};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gate configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Seconds the confirmation stays up before asking for a refresh
    pub countdown_secs: u32,
    /// Countdown tick length in milliseconds
    pub tick_ms: u64,
}

impl GateConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With countdown length
    #[inline]
    #[must_use]
    pub fn with_countdown_secs(mut self, secs: u32) -> Self {
        self.countdown_secs = secs;
        self
    }

    /// With tick length
    #[inline]
    #[must_use]
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    /// Tick length as a duration
    #[inline]
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 5,
            tick_ms: 1_000,
        }
    }
}

/// Inputs a page passes on every render
#[derive(Debug, Clone, PartialEq)]
pub struct GateProps {
    /// Plan value as stored on the account
    pub current_plan: PlanValue,
    /// Feature this gate protects
    pub requirement: FeatureRequirement,
}

impl GateProps {
    /// Create props
    #[inline]
    #[must_use]
    pub fn new(current_plan: impl Into<PlanValue>, requirement: FeatureRequirement) -> Self {
        Self {
            current_plan: current_plan.into(),
            requirement,
        }
    }
}

/// Local upgrade-flow state of one gate instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Showing the lock and upgrade offers
    Blocked,
    /// Plan write in flight
    Upgrading {
        /// Tier being purchased
        target: Tier,
    },
    /// Upgrade stored, confirmation counting down
    Confirmed {
        /// New tier
        tier: Tier,
        /// Seconds left before the refresh request
        remaining_secs: u32,
    },
}

/// What the page should display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum GateView {
    /// Render the protected content
    Granted,
    /// Render the lock screen
    Blocked(BlockedView),
    /// Render the upgrade confirmation
    Confirmed(ConfirmedView),
}

impl GateView {
    /// Check if protected content is shown
    #[inline]
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Lock screen contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedView {
    /// Locked feature
    pub feature_name: String,
    /// Tier the feature needs
    pub required_tier: Tier,
    /// Display name of the required plan
    pub required_plan: String,
    /// Account's normalized tier
    pub current_tier: Tier,
    /// Display name of the current plan
    pub current_plan: String,
    /// Plans on offer, ascending
    pub offers: Vec<PlanDefinition>,
    /// Tier being purchased, while a write is in flight
    pub upgrading_to: Option<Tier>,
    /// Last upgrade failure
    pub error: Option<String>,
    /// Whether a session exists
    pub signed_in: bool,
}

impl BlockedView {
    /// Check if a write is in flight
    #[inline]
    #[must_use]
    pub fn upgrading(&self) -> bool {
        self.upgrading_to.is_some()
    }

    /// Check if the upgrade buttons are enabled
    #[inline]
    #[must_use]
    pub fn can_upgrade(&self) -> bool {
        self.signed_in && !self.upgrading() && !self.offers.is_empty()
    }

    /// Tiers on offer
    #[must_use]
    pub fn offer_tiers(&self) -> Vec<Tier> {
        self.offers.iter().map(|p| p.tier).collect()
    }
}

/// Upgrade confirmation contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedView {
    /// Feature the user upgraded for
    pub feature_name: String,
    /// New tier
    pub tier: Tier,
    /// Display name of the new plan
    pub plan_name: String,
    /// Features now available
    pub features: Vec<String>,
    /// Seconds until the refresh request
    pub remaining_secs: u32,
}

/// Notifications to the page hosting the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// Upgrade stored, page should update its copy of the plan
    TierChanged(Tier),
    /// Confirmation countdown advanced
    CountdownTick {
        /// Seconds left
        remaining_secs: u32,
    },
    /// Page should refetch its account snapshot
    RefreshRequested,
    /// User closed the confirmation early
    Dismissed,
}
