use portal_access::{available_upgrade_tiers, evaluate_access, normalize_tier, PlanValue, Tier};
use proptest::prelude::*;

#[test]
fn test_unrecognised_plans_are_free() {
    let absent: Option<&str> = None;
    for value in [
        PlanValue::from("none"),
        PlanValue::from(""),
        PlanValue::from(absent),
        PlanValue::Missing,
        PlanValue::from("abc"),
    ] {
        assert_eq!(normalize_tier(&value), Tier::FREE, "{value:?}");
    }
}

#[test]
fn test_small_levels_round_trip() {
    for n in 0..=10_u32 {
        assert_eq!(normalize_tier(&PlanValue::from(n.to_string())), Tier(n));
        assert_eq!(normalize_tier(&PlanValue::from(n)), Tier(n));
    }
}

#[test]
fn test_upgrade_offers_at_bounds() {
    let all = [Tier(0), Tier(1), Tier(2)];
    assert_eq!(available_upgrade_tiers(Tier(2), &all), Vec::<Tier>::new());
    assert_eq!(available_upgrade_tiers(Tier(0), &all), vec![Tier(1), Tier(2)]);
}

proptest! {
    #[test]
    fn prop_access_matches_tier_order(raw in any::<i64>(), required in 0u32..16) {
        let plan = PlanValue::from(raw);
        let decision = evaluate_access(&plan, Tier(required));
        prop_assert_eq!(decision.has_access, normalize_tier(&plan) >= Tier(required));
        prop_assert_eq!(decision.required_tier, Tier(required));
    }

    #[test]
    fn prop_text_access_matches_tier_order(raw in ".*", required in 0u32..16) {
        let plan = PlanValue::from(raw);
        let decision = evaluate_access(&plan, Tier(required));
        prop_assert_eq!(decision.has_access, normalize_tier(&plan) >= Tier(required));
    }

    #[test]
    fn prop_normalize_is_idempotent(raw in ".*") {
        let once = normalize_tier(&PlanValue::from(raw));
        prop_assert_eq!(normalize_tier(&PlanValue::from(once)), once);
        prop_assert_eq!(normalize_tier(&PlanValue::from(once.to_plan_string())), once);
    }

    #[test]
    fn prop_negative_numbers_never_grant(raw in i64::MIN..0) {
        prop_assert_eq!(normalize_tier(&PlanValue::from(raw)), Tier::FREE);
    }

    #[test]
    fn prop_offers_strictly_above_and_ascending(
        current in 0u32..8,
        tiers in proptest::collection::vec(0u32..8, 0..12),
    ) {
        let tiers: Vec<Tier> = tiers.into_iter().map(Tier).collect();
        let offers = available_upgrade_tiers(Tier(current), &tiers);
        prop_assert!(offers.iter().all(|t| *t > Tier(current)));
        prop_assert!(offers.windows(2).all(|w| w[0] < w[1]));
        for t in &tiers {
            if *t > Tier(current) {
                prop_assert!(offers.contains(t));
            }
        }
    }
}
