use parking_lot::Mutex;
use portal_access::Tier;
use portal_account::StoreError;
use portal_gate::{GateContext, GateError, GateEvent, GatePhase, GateProps, GateView};
use portal_test_utils::{
    requirement, seed_account, service_over, signed_in, signed_out, stored_plan, FlakyStore,
    GatedStore,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;

async fn setup(plan: serde_json::Value) -> (Arc<FlakyStore>, GateContext) {
    let store = Arc::new(FlakyStore::new());
    seed_account(&*store, "owner", plan).await;
    let ctx = GateContext::new(service_over(store.clone()), signed_in("owner"));
    (store, ctx)
}

fn broadband(plan: &str) -> GateProps {
    GateProps::new(plan, requirement("Broadband Access Initiatives", 2))
}

fn recorder() -> (Arc<Mutex<Vec<Tier>>>, impl Fn(Tier) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |tier| sink.lock().push(tier))
}

#[tokio::test]
async fn test_free_plan_is_blocked_with_offers() {
    let (_, ctx) = setup(json!("none")).await;
    let (gate, _events) = ctx.mount();

    let view = gate.render(&GateProps::new("none", requirement("Business Workshops", 1)));
    let GateView::Blocked(blocked) = view else {
        panic!("expected blocked view, got {view:?}");
    };
    assert_eq!(blocked.offer_tiers(), vec![Tier::STANDARD, Tier::PREMIUM]);
    assert_eq!(blocked.required_plan, "Standard");
    assert_eq!(blocked.current_plan, "Free");
    assert_eq!(blocked.current_tier, Tier::FREE);
    assert!(blocked.can_upgrade());
    assert!(blocked.error.is_none());
}

#[tokio::test]
async fn test_matching_plan_is_granted() {
    let (_, ctx) = setup(json!("1")).await;
    let (gate, _events) = ctx.mount();

    let view = gate.render(&GateProps::new("1", requirement("Business Workshops", 1)));
    assert_eq!(view, GateView::Granted);
}

#[tokio::test]
async fn test_top_tier_short_of_requirement_has_no_offers() {
    let (_, ctx) = setup(json!("2")).await;
    let (gate, _events) = ctx.mount();

    let view = gate.render(&GateProps::new("2", requirement("Enterprise Reporting", 3)));
    let GateView::Blocked(blocked) = view else {
        panic!("expected blocked view");
    };
    assert!(blocked.offers.is_empty());
    assert!(!blocked.can_upgrade());
    assert_eq!(blocked.required_plan, "Tier 3");
}

#[tokio::test(start_paused = true)]
async fn test_successful_upgrade_confirms_and_counts_down() {
    let (store, ctx) = setup(json!("none")).await;
    let (seen, on_tier_change) = recorder();
    let (gate, mut events) = ctx.mount();
    let gate = gate.with_on_tier_change(on_tier_change);

    gate.request_upgrade(Tier::PREMIUM).await.unwrap();

    assert_eq!(*seen.lock(), vec![Tier::PREMIUM]);
    assert_eq!(events.recv().await, Some(GateEvent::TierChanged(Tier::PREMIUM)));
    assert_eq!(stored_plan(&*store, "owner").await, Some(json!("2")));
    assert_eq!(
        gate.phase(),
        GatePhase::Confirmed {
            tier: Tier::PREMIUM,
            remaining_secs: 5
        }
    );

    let GateView::Confirmed(confirmed) = gate.render(&broadband("none")) else {
        panic!("expected confirmation");
    };
    assert_eq!(confirmed.plan_name, "Premium");
    assert_eq!(confirmed.remaining_secs, 5);
    assert_eq!(confirmed.features.len(), 5);

    for remaining_secs in (0..5).rev() {
        assert_eq!(events.recv().await, Some(GateEvent::CountdownTick { remaining_secs }));
    }
    assert_eq!(events.recv().await, Some(GateEvent::RefreshRequested));
    assert_eq!(gate.phase(), GatePhase::Blocked);

    // Caller has applied the new tier by now
    assert!(gate.render(&broadband("2")).is_granted());
}

#[tokio::test(start_paused = true)]
async fn test_fresh_props_override_confirmation() {
    let (_, ctx) = setup(json!("none")).await;
    let (gate, _events) = ctx.mount();

    gate.request_upgrade(Tier::PREMIUM).await.unwrap();
    assert!(matches!(gate.phase(), GatePhase::Confirmed { .. }));
    assert!(gate.render(&broadband("2")).is_granted());
    assert!(matches!(gate.render(&broadband("1")), GateView::Confirmed(_)));
}

#[tokio::test]
async fn test_failed_write_stays_blocked_and_retryable() {
    let (store, ctx) = setup(json!("none")).await;
    let (seen, on_tier_change) = recorder();
    let (gate, mut events) = ctx.mount();
    let gate = gate.with_on_tier_change(on_tier_change);

    store.fail_writes(StoreError::Unavailable("network down".into()));
    let err = gate.request_upgrade(Tier::PREMIUM).await.unwrap_err();
    assert!(matches!(err, GateError::Store(_)));
    assert!(err.is_retryable());

    assert_eq!(gate.phase(), GatePhase::Blocked);
    assert!(!gate.is_upgrading());
    let GateView::Blocked(blocked) = gate.render(&broadband("none")) else {
        panic!("expected blocked view");
    };
    assert!(blocked.error.is_some());
    assert!(!blocked.upgrading());
    assert!(blocked.can_upgrade());
    assert!(seen.lock().is_empty());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(stored_plan(&*store, "owner").await, Some(json!("none")));

    // User tries again once the network is back
    store.heal();
    gate.request_upgrade(Tier::PREMIUM).await.unwrap();
    assert_eq!(*seen.lock(), vec![Tier::PREMIUM]);
    assert_eq!(events.recv().await, Some(GateEvent::TierChanged(Tier::PREMIUM)));
}

#[tokio::test(start_paused = true)]
async fn test_unmount_mid_countdown_stops_updates() {
    let (_, ctx) = setup(json!("none")).await;
    let (gate, mut events) = ctx.mount();

    gate.request_upgrade(Tier::PREMIUM).await.unwrap();
    assert_eq!(events.recv().await, Some(GateEvent::TierChanged(Tier::PREMIUM)));
    assert_eq!(events.recv().await, Some(GateEvent::CountdownTick { remaining_secs: 4 }));
    assert_eq!(events.recv().await, Some(GateEvent::CountdownTick { remaining_secs: 3 }));

    gate.unmount();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(
        gate.phase(),
        GatePhase::Confirmed {
            tier: Tier::PREMIUM,
            remaining_secs: 3
        }
    );
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert!(matches!(
        gate.request_upgrade(Tier::PREMIUM).await,
        Err(GateError::Unmounted)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_drop_mid_countdown_closes_event_stream() {
    let (_, ctx) = setup(json!("none")).await;
    let (gate, mut events) = ctx.mount();

    gate.request_upgrade(Tier::STANDARD).await.unwrap();
    assert_eq!(events.recv().await, Some(GateEvent::TierChanged(Tier::STANDARD)));
    assert_eq!(events.recv().await, Some(GateEvent::CountdownTick { remaining_secs: 4 }));
    assert_eq!(events.recv().await, Some(GateEvent::CountdownTick { remaining_secs: 3 }));

    drop(gate);
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn test_unmount_during_write_discards_result() {
    let store = Arc::new(GatedStore::new());
    seed_account(&*store, "owner", json!("none")).await;
    let ctx = GateContext::new(service_over(store.clone()), signed_in("owner"));
    let (seen, on_tier_change) = recorder();
    let (gate, mut events) = ctx.mount();
    let gate = Arc::new(gate.with_on_tier_change(on_tier_change));

    let pending = tokio::spawn({
        let gate = gate.clone();
        async move { gate.request_upgrade(Tier::STANDARD).await }
    });
    store.wait_for_write().await;
    assert!(gate.is_upgrading());
    assert!(matches!(
        gate.request_upgrade(Tier::PREMIUM).await,
        Err(GateError::UpgradeInFlight)
    ));
    let GateView::Blocked(blocked) = gate.render(&broadband("none")) else {
        panic!("expected blocked view");
    };
    assert_eq!(blocked.upgrading_to, Some(Tier::STANDARD));
    assert!(!blocked.can_upgrade());

    gate.unmount();
    store.release();
    assert!(pending.await.unwrap().is_ok());

    assert!(seen.lock().is_empty());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(stored_plan(&*store, "owner").await, Some(json!("1")));
}

#[tokio::test]
async fn test_signed_out_fails_closed() {
    let store = Arc::new(FlakyStore::new());
    seed_account(&*store, "owner", json!("2")).await;
    let writes_before = store.write_count();
    let ctx = GateContext::new(service_over(store.clone()), signed_out());
    let (gate, mut events) = ctx.mount();

    let GateView::Blocked(blocked) = gate.render(&GateProps::new("2", requirement("Business Workshops", 1)))
    else {
        panic!("signed-out gate must not grant");
    };
    assert!(!blocked.signed_in);
    assert!(blocked.offers.is_empty());
    assert!(!blocked.can_upgrade());

    let err = gate.request_upgrade(Tier::PREMIUM).await.unwrap_err();
    assert!(matches!(err, GateError::Unauthenticated));
    assert_eq!(store.write_count(), writes_before);
    assert_eq!(gate.phase(), GatePhase::Blocked);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

    let GateView::Blocked(blocked) = gate.render(&broadband("none")) else {
        panic!("expected blocked view");
    };
    assert!(blocked.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_clears_countdown() {
    let (_, ctx) = setup(json!("none")).await;
    let (gate, mut events) = ctx.mount();

    assert!(!gate.dismiss());
    gate.request_upgrade(Tier::PREMIUM).await.unwrap();
    assert_eq!(events.recv().await, Some(GateEvent::TierChanged(Tier::PREMIUM)));

    assert!(gate.dismiss());
    assert_eq!(gate.phase(), GatePhase::Blocked);
    assert_eq!(events.recv().await, Some(GateEvent::Dismissed));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_continue_requests_refresh() {
    let (_, ctx) = setup(json!("none")).await;
    let (gate, mut events) = ctx.mount();

    gate.request_upgrade(Tier::STANDARD).await.unwrap();
    assert_eq!(events.recv().await, Some(GateEvent::TierChanged(Tier::STANDARD)));
    assert!(gate.continue_to_feature());
    assert_eq!(events.recv().await, Some(GateEvent::RefreshRequested));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_gates_keep_independent_state() {
    let (store, ctx) = setup(json!("none")).await;
    let (first, _first_events) = ctx.mount();
    let (second, _second_events) = ctx.mount();

    first.request_upgrade(Tier::PREMIUM).await.unwrap();
    assert!(matches!(first.phase(), GatePhase::Confirmed { .. }));
    assert_eq!(second.phase(), GatePhase::Blocked);

    // Last write wins at the store
    second.request_upgrade(Tier::STANDARD).await.unwrap();
    assert_eq!(stored_plan(&*store, "owner").await, Some(json!("1")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unmount_waits_for_running_callback() {
    let (_, ctx) = setup(json!("none")).await;
    let log = Arc::new(Mutex::new(Vec::new()));
    let (entered_tx, entered_rx) = std::sync::mpsc::channel();
    let (gate, mut events) = ctx.mount();
    let gate = Arc::new(gate.with_on_tier_change({
        let log = log.clone();
        move |_| {
            let _ = entered_tx.send(());
            std::thread::sleep(Duration::from_millis(50));
            log.lock().push("callback");
        }
    }));

    let unmounter = std::thread::spawn({
        let gate = gate.clone();
        let log = log.clone();
        move || {
            entered_rx.recv().unwrap();
            gate.unmount();
            log.lock().push("unmounted");
        }
    });

    gate.request_upgrade(Tier::PREMIUM).await.unwrap();
    unmounter.join().unwrap();

    assert_eq!(*log.lock(), vec!["callback", "unmounted"]);
    assert!(!gate.is_mounted());
    assert_eq!(events.recv().await, Some(GateEvent::TierChanged(Tier::PREMIUM)));
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}
