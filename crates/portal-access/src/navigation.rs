//! Dashboard navigation with per-entry lock state

use crate::catalog::PlanCatalog;
use crate::policy::FeatureRequirement;
use crate::tier::{normalize_tier, PlanValue, Tier};
use serde::{Deserialize, Serialize};

/// Static menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Route path
    pub href: String,
    /// Feature behind the route
    pub requirement: FeatureRequirement,
    /// Only shown to administrators
    pub admin_only: bool,
}

impl MenuItem {
    fn feature(title: &str, href: &str, tier: Tier) -> Self {
        Self {
            href: href.to_string(),
            requirement: FeatureRequirement::new(title, tier),
            admin_only: false,
        }
    }

    fn admin(title: &str, href: &str) -> Self {
        Self {
            admin_only: true,
            ..Self::feature(title, href, Tier::FREE)
        }
    }
}

/// Menu entry resolved against one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    /// Entry title
    pub title: String,
    /// Route path
    pub href: String,
    /// Whether the current plan is below the requirement
    pub locked: bool,
    /// Plan name shown on locked entries
    pub badge: Option<String>,
}

/// Dashboard menu, in display order
#[must_use]
pub fn dashboard_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::feature("Dashboard", "/dashboard/", Tier::FREE),
        MenuItem::feature("Funding Application Portal", "/dashboard/funding", Tier::FREE),
        MenuItem::feature("Business Workshops", "/dashboard/workshops", Tier::STANDARD),
        MenuItem::feature("Market Visibility Tools", "/dashboard/visibility", Tier::STANDARD),
        MenuItem::feature("Mergers and Acquisitions", "/dashboard/documents", Tier::PREMIUM),
        MenuItem::feature("Broadband Access Initiatives", "/dashboard/broadband", Tier::PREMIUM),
        MenuItem::admin("Funding Applications", "/dashboard/admin/funding"),
        MenuItem::admin("Users", "/dashboard/admin"),
        MenuItem::admin("Business Profiles", "/dashboard/admin/businesses"),
    ]
}

/// Resolve `items` against an account's plan
pub fn menu_view(
    items: &[MenuItem],
    plan: &PlanValue,
    is_admin: bool,
    catalog: &PlanCatalog,
) -> Vec<MenuEntry> {
    let current = normalize_tier(plan);

    items
        .iter()
        .filter(|item| is_admin || !item.admin_only)
        .map(|item| {
            let required = item.requirement.required_tier;
            let locked = current < required;
            MenuEntry {
                title: item.requirement.feature_name.clone(),
                href: item.href.clone(),
                locked,
                badge: locked.then(|| catalog.name_of(required)),
            }
        })
        .collect()
}

/// Requirement for a route, if the menu gates it
#[must_use]
pub fn requirement_for<'a>(items: &'a [MenuItem], href: &str) -> Option<&'a FeatureRequirement> {
    items.iter().find(|i| i.href == href).map(|i| &i.requirement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked_titles(entries: &[MenuEntry]) -> Vec<&str> {
        entries.iter().filter(|e| e.locked).map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn free_plan_locks_paid_entries() {
        let entries = menu_view(&dashboard_menu(), &PlanValue::none(), false, &PlanCatalog::standard());
        assert_eq!(entries.len(), 6);
        assert_eq!(
            locked_titles(&entries),
            [
                "Business Workshops",
                "Market Visibility Tools",
                "Mergers and Acquisitions",
                "Broadband Access Initiatives"
            ]
        );
        assert_eq!(entries[2].badge.as_deref(), Some("Standard"));
        assert_eq!(entries[5].badge.as_deref(), Some("Premium"));
    }

    #[test]
    fn standard_plan_unlocks_middle_entries() {
        let entries = menu_view(&dashboard_menu(), &"1".into(), false, &PlanCatalog::standard());
        assert_eq!(locked_titles(&entries), ["Mergers and Acquisitions", "Broadband Access Initiatives"]);
    }

    #[test]
    fn admins_see_admin_entries() {
        let entries = menu_view(&dashboard_menu(), &"2".into(), true, &PlanCatalog::standard());
        assert_eq!(entries.len(), 9);
        assert_eq!(
            entries[6..].iter().map(|e| e.href.as_str()).collect::<Vec<_>>(),
            ["/dashboard/admin/funding", "/dashboard/admin", "/dashboard/admin/businesses"]
        );
        assert!(locked_titles(&entries).is_empty());
        assert!(entries.iter().all(|e| e.badge.is_none()));
    }

    #[test]
    fn route_requirement_lookup() {
        let menu = dashboard_menu();
        let req = requirement_for(&menu, "/dashboard/broadband").unwrap();
        assert_eq!(req.required_tier, Tier::PREMIUM);
        assert!(requirement_for(&menu, "/nowhere").is_none());
    }
}
