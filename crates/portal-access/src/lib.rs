//! Portal Access - plan tiers and feature gating policy
//!
//! Pure decision logic shared by every gated page:
//! - Normalizes stored plan values into a [`Tier`]
//! - Decides feature access for a required tier
//! - Enumerates upgrade offers from the [`PlanCatalog`]
//! - Resolves the dashboard menu lock state
//!
//! # Example
//!
//! ```rust
//! use portal_access::{evaluate_access, PlanValue, Tier};
//!
//! let decision = evaluate_access(&PlanValue::from("none"), Tier::STANDARD);
//! assert!(!decision.has_access);
//! assert_eq!(decision.current_tier, Tier::FREE);
//! ```

#![warn(unreachable_pub)]

pub mod catalog;
pub mod error;
pub mod navigation;
pub mod policy;
pub mod tier;

pub use catalog::{PlanCatalog, PlanDefinition};
pub use error::CatalogError;
pub use navigation::{dashboard_menu, menu_view, requirement_for, MenuEntry, MenuItem};
pub use policy::{available_upgrade_tiers, evaluate_access, FeatureRequirement, GateDecision};
pub use tier::{normalize_tier, PlanValue, Tier, NO_PLAN};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with plan tiers
    pub use crate::{
        available_upgrade_tiers, evaluate_access, normalize_tier, FeatureRequirement,
        GateDecision, PlanCatalog, PlanValue, Tier,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
