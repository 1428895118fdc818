//! Plan catalog
//!
//! The closed set of tiers the portal sells, with the display data the gate
//! shows for each one.

use crate::error::CatalogError;
use crate::policy::available_upgrade_tiers;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// One purchasable plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDefinition {
    /// Tier this plan grants
    pub tier: Tier,
    /// Display name
    pub name: String,
    /// Monthly price label
    pub price: String,
    /// Features unlocked at this tier (cumulative)
    pub features: Vec<String>,
}

impl PlanDefinition {
    /// Create new plan definition
    #[must_use]
    pub fn new(tier: Tier, name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            tier,
            name: name.into(),
            price: price.into(),
            features: Vec::new(),
        }
    }

    /// With feature list
    #[must_use]
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }
}

/// Validated, tier-ordered set of plans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PlanDefinition>", into = "Vec<PlanDefinition>")]
pub struct PlanCatalog {
    plans: Vec<PlanDefinition>,
    tiers: Vec<Tier>,
}

impl PlanCatalog {
    /// Build catalog, rejecting empty, unordered or unnamed plan lists
    ///
    /// # Errors
    /// Returns [`CatalogError`] when the plan list is not a valid tier ladder.
    pub fn new(plans: Vec<PlanDefinition>) -> Result<Self, CatalogError> {
        let first = plans.first().ok_or(CatalogError::Empty)?;
        if first.tier != Tier::FREE {
            return Err(CatalogError::MissingFreeTier);
        }

        for pair in plans.windows(2) {
            if pair[1].tier <= pair[0].tier {
                return Err(CatalogError::OutOfOrder {
                    previous: pair[0].tier,
                    next: pair[1].tier,
                });
            }
        }

        if let Some(unnamed) = plans.iter().find(|p| p.name.trim().is_empty()) {
            return Err(CatalogError::UnnamedPlan(unnamed.tier));
        }

        let tiers = plans.iter().map(|p| p.tier).collect();
        Ok(Self { plans, tiers })
    }

    /// Free / Standard / Premium ladder used by the dashboard
    #[must_use]
    pub fn standard() -> Self {
        let plans = vec![
            PlanDefinition::new(Tier::FREE, "Free", "R0").with_features(["Funding Application Portal"]),
            PlanDefinition::new(Tier::STANDARD, "Standard", "R99").with_features([
                "Funding Application Portal",
                "Business Workshops",
                "Market Visibility Tools",
            ]),
            PlanDefinition::new(Tier::PREMIUM, "Premium", "R149").with_features([
                "Funding Application Portal",
                "Business Workshops",
                "Market Visibility Tools",
                "Secure Document Management",
                "Broadband Access Initiatives",
            ]),
        ];

        Self {
            tiers: plans.iter().map(|p| p.tier).collect(),
            plans,
        }
    }

    /// All tiers, ascending
    #[inline]
    #[must_use]
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// All plans, ascending by tier
    #[inline]
    #[must_use]
    pub fn plans(&self) -> &[PlanDefinition] {
        &self.plans
    }

    /// Plan for tier, if sold
    #[must_use]
    pub fn get(&self, tier: Tier) -> Option<&PlanDefinition> {
        self.plans.iter().find(|p| p.tier == tier)
    }

    /// Display name, falling back to `Tier N` for unknown tiers
    #[must_use]
    pub fn name_of(&self, tier: Tier) -> String {
        self.get(tier)
            .map_or_else(|| format!("Tier {tier}"), |p| p.name.clone())
    }

    /// Highest tier on sale
    #[must_use]
    pub fn max_tier(&self) -> Tier {
        self.tiers.last().copied().unwrap_or(Tier::FREE)
    }

    /// Plans a user on `current` can upgrade to, ascending
    #[must_use]
    pub fn upgrade_offers(&self, current: Tier) -> Vec<&PlanDefinition> {
        available_upgrade_tiers(current, &self.tiers)
            .into_iter()
            .filter_map(|t| self.get(t))
            .collect()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<PlanDefinition>> for PlanCatalog {
    type Error = CatalogError;

    fn try_from(plans: Vec<PlanDefinition>) -> Result<Self, Self::Error> {
        Self::new(plans)
    }
}

impl From<PlanCatalog> for Vec<PlanDefinition> {
    fn from(catalog: PlanCatalog) -> Self {
        catalog.plans
    }
}
