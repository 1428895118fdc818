//! End-to-end gate walkthrough against the in-memory backends
//!
//! Seeds a demo account, signs it in, mounts one gate in front of a feature
//! and drives a single upgrade attempt, recording every view and event the
//! hosting page would see.

use crate::app::App;
use crate::config::PortalConfig;
use crate::error::Result;
use async_trait::async_trait;
use portal_access::{FeatureRequirement, PlanValue, Tier};
use portal_account::{
    AuthProfile, Document, DocumentStore, MemoryStore, StoreError, USERS_COLLECTION,
};
use portal_gate::{GateEvent, GateProps, GateView};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identity the walkthrough signs in as
pub const DEMO_IDENTITY: &str = "demo-owner";

/// Walkthrough inputs
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    /// Raw plan stored on the demo account before sign-in
    pub plan: PlanValue,
    /// Feature the gate protects
    pub requirement: FeatureRequirement,
    /// Tier to purchase when blocked
    pub upgrade_to: Tier,
    /// Make the plan write fail
    pub fail_write: bool,
}

/// One thing the page observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Gate rendered
    View(GateView),
    /// Gate notified the page
    Event(GateEvent),
    /// Upgrade attempt failed with this message
    Failed(String),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(GateView::Granted) => write!(f, "view      granted"),
            Self::View(GateView::Blocked(b)) => {
                write!(
                    f,
                    "view      blocked: {} needs {}, account on {}",
                    b.feature_name, b.required_plan, b.current_plan
                )?;
                if !b.offers.is_empty() {
                    let offers: Vec<String> =
                        b.offers.iter().map(|p| format!("{} ({})", p.name, p.price)).collect();
                    write!(f, "; offers {}", offers.join(", "))?;
                }
                if let Some(error) = &b.error {
                    write!(f, "; error \"{error}\"")?;
                }
                Ok(())
            }
            Self::View(GateView::Confirmed(c)) => write!(
                f,
                "view      confirmed: {} active, continuing in {}s",
                c.plan_name, c.remaining_secs
            ),
            Self::Event(GateEvent::TierChanged(tier)) => write!(f, "event     tier changed to {tier}"),
            Self::Event(GateEvent::CountdownTick { remaining_secs }) => {
                write!(f, "event     countdown {remaining_secs}")
            }
            Self::Event(GateEvent::RefreshRequested) => write!(f, "event     refresh requested"),
            Self::Event(GateEvent::Dismissed) => write!(f, "event     dismissed"),
            Self::Failed(message) => write!(f, "failed    {message}"),
        }
    }
}

/// Recorded walkthrough
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// Observations in order
    pub steps: Vec<Step>,
    /// Plan as stored once the walkthrough ends
    pub stored_plan: PlanValue,
}

impl SimulationReport {
    /// Whether the last render showed the feature
    #[must_use]
    pub fn granted(&self) -> bool {
        self.steps
            .iter()
            .rev()
            .find_map(|s| match s {
                Step::View(view) => Some(view.is_granted()),
                _ => None,
            })
            .unwrap_or(false)
    }
}

/// Memory store whose writes can be switched off
#[derive(Debug, Default)]
struct SwitchableStore {
    inner: MemoryStore,
    offline: AtomicBool,
}

impl SwitchableStore {
    fn check_write(&self) -> std::result::Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SwitchableStore {
    async fn get(&self, collection: &str, id: &str) -> std::result::Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn add(&self, collection: &str, fields: Document) -> std::result::Result<String, StoreError> {
        self.check_write()?;
        self.inner.add(collection, fields).await
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> std::result::Result<(), StoreError> {
        self.check_write()?;
        self.inner.set_merge(collection, id, fields).await
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> std::result::Result<(), StoreError> {
        self.check_write()?;
        self.inner.update_field(collection, id, field, value).await
    }

    async fn list(&self, collection: &str) -> std::result::Result<Vec<(String, Document)>, StoreError> {
        self.inner.list(collection).await
    }
}

/// Run one walkthrough
///
/// # Errors
/// Store or session failures while preparing the demo account. Upgrade
/// failures are recorded as [`Step::Failed`], not returned.
pub async fn run(config: PortalConfig, options: SimulationOptions) -> Result<SimulationReport> {
    let store = Arc::new(SwitchableStore::default());
    let mut seed = Document::new();
    seed.insert("plan".to_string(), Value::from(options.plan.to_stored()));
    store
        .set_merge(USERS_COLLECTION, DEMO_IDENTITY, seed)
        .await
        .map_err(portal_account::AccountError::from)?;

    let app = App::with_store(config, store.clone());
    let account = app
        .sign_in(AuthProfile::new(DEMO_IDENTITY).with_display_name("Demo Owner"))
        .await?;
    tracing::info!(identity = %account.identity, tier = %account.tier(), "demo account ready");

    if options.fail_write {
        store.offline.store(true, Ordering::SeqCst);
    }

    let session = app.session().clone();
    let (gate, mut events) = app.gates().mount();
    let gate = gate.with_on_tier_change(move |tier| session.apply_local_tier(tier));

    let props = |app: &App| {
        let plan = app.session().current().map(|a| a.plan).unwrap_or_default();
        GateProps::new(plan, options.requirement.clone())
    };

    // Pre-upgrade props keep the confirmation visible
    let stale = props(&app);
    let first = gate.render(&stale);
    let granted = first.is_granted();
    let mut steps = vec![Step::View(first)];
    if !granted {
        match gate.request_upgrade(options.upgrade_to).await {
            Err(e) => {
                steps.push(Step::Failed(e.user_message()));
                steps.push(Step::View(gate.render(&props(&app))));
            }
            Ok(()) => {
                steps.push(Step::View(gate.render(&stale)));
                while let Some(event) = events.recv().await {
                    steps.push(Step::Event(event));
                    if matches!(event, GateEvent::RefreshRequested | GateEvent::Dismissed) {
                        break;
                    }
                }
                app.session().refresh().await?;
                steps.push(Step::View(gate.render(&props(&app))));
            }
        }
    }

    let stored_plan = app
        .service()
        .refresh_account(&account.identity)
        .await?
        .map(|a| a.plan)
        .unwrap_or_default();

    Ok(SimulationReport { steps, stored_plan })
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_gate::GateConfig;

    fn options(plan: &str, required: u32, upgrade_to: u32) -> SimulationOptions {
        SimulationOptions {
            plan: PlanValue::from(plan),
            requirement: FeatureRequirement::new("Business Workshops", Tier::new(required)),
            upgrade_to: Tier::new(upgrade_to),
            fail_write: false,
        }
    }

    fn fast() -> PortalConfig {
        PortalConfig::default().with_gate(GateConfig::new().with_countdown_secs(2))
    }

    #[tokio::test]
    async fn entitled_account_sees_content_immediately() {
        let report = run(fast(), options("2", 1, 2)).await.unwrap();
        assert_eq!(report.steps, vec![Step::View(GateView::Granted)]);
        assert_eq!(report.stored_plan, PlanValue::from("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn upgrade_walkthrough_ends_granted() {
        let report = run(fast(), options("none", 1, 1)).await.unwrap();

        assert!(matches!(report.steps[0], Step::View(GateView::Blocked(_))));
        assert!(matches!(report.steps[1], Step::View(GateView::Confirmed(_))));
        assert_eq!(
            report.steps[2..6],
            [
                Step::Event(GateEvent::TierChanged(Tier::STANDARD)),
                Step::Event(GateEvent::CountdownTick { remaining_secs: 1 }),
                Step::Event(GateEvent::CountdownTick { remaining_secs: 0 }),
                Step::Event(GateEvent::RefreshRequested),
            ]
        );
        assert!(report.granted());
        assert_eq!(report.stored_plan, PlanValue::from("1"));
    }

    #[tokio::test]
    async fn failed_write_stays_blocked() {
        let mut opts = options("none", 2, 2);
        opts.fail_write = true;
        let report = run(fast(), opts).await.unwrap();

        assert!(matches!(report.steps[1], Step::Failed(_)));
        let Step::View(GateView::Blocked(blocked)) = &report.steps[2] else {
            panic!("expected blocked view after failure");
        };
        assert!(blocked.error.is_some());
        assert!(!report.granted());
        assert_eq!(report.stored_plan, PlanValue::from("none"));
    }

    #[test]
    fn steps_render_as_lines() {
        let line = Step::Event(GateEvent::CountdownTick { remaining_secs: 3 }).to_string();
        assert_eq!(line, "event     countdown 3");
        assert_eq!(Step::View(GateView::Granted).to_string(), "view      granted");
    }
}
