//! Subscription gate
//!
//! One [`SubscriptionGate`] per mounted page section. The caller's latest
//! account data always wins: whenever the props grant access the gate renders
//! [`GateView::Granted`], whatever its local upgrade flow is doing. Otherwise
//! the local [`GatePhase`] picks between the lock screen and the confirmation.
//!
//! State is owned by the instance and never shared between gates. Two gates
//! for the same account may both write the plan; the store keeps the last one.

use crate::countdown::Countdown;
use crate::error::GateError;
use crate::types::{BlockedView, ConfirmedView, GateConfig, GateEvent, GatePhase, GateProps, GateView};
use parking_lot::Mutex;
use portal_access::{PlanCatalog, Tier};
use portal_account::{AccountService, AuthProvider};
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Callback receiving the new tier as soon as an upgrade is stored
pub type TierCallback = Box<dyn Fn(Tier) + Send + Sync>;

/// Capabilities shared by every gate, handed out by the composition root
#[derive(Clone)]
pub struct GateContext {
    service: Arc<AccountService>,
    auth: Arc<dyn AuthProvider>,
    catalog: Arc<PlanCatalog>,
    config: GateConfig,
}

impl std::fmt::Debug for GateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateContext")
            .field("catalog", &self.catalog)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GateContext {
    /// Create context with the standard catalog and default config
    #[must_use]
    pub fn new(service: Arc<AccountService>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            service,
            auth,
            catalog: Arc::new(PlanCatalog::standard()),
            config: GateConfig::default(),
        }
    }

    /// With plan catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: PlanCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// With gate configuration
    #[must_use]
    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    /// Plan catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Mount a new gate
    #[must_use]
    pub fn mount(&self) -> (SubscriptionGate, mpsc::UnboundedReceiver<GateEvent>) {
        SubscriptionGate::mount(self.clone())
    }
}

#[derive(Debug)]
struct GateState {
    phase: GatePhase,
    error: Option<String>,
    mounted: bool,
    countdown: Option<Countdown>,
}

/// Per-instance feature gate with its upgrade flow
pub struct SubscriptionGate {
    ctx: GateContext,
    state: Arc<Mutex<GateState>>,
    events: mpsc::UnboundedSender<GateEvent>,
    on_tier_change: Option<TierCallback>,
}

impl std::fmt::Debug for SubscriptionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGate")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl SubscriptionGate {
    /// Mount a gate, returning it with the receiver for its events
    #[must_use]
    pub fn mount(ctx: GateContext) -> (Self, mpsc::UnboundedReceiver<GateEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let gate = Self {
            ctx,
            state: Arc::new(Mutex::new(GateState {
                phase: GatePhase::Blocked,
                error: None,
                mounted: true,
                countdown: None,
            })),
            events,
            on_tier_change: None,
        };
        (gate, rx)
    }

    /// With callback fired on a stored upgrade, before the confirmation shows
    ///
    /// Runs with the gate's state locked, so it must not call back into this
    /// gate. It never runs once [`unmount`](Self::unmount) has returned.
    #[must_use]
    pub fn with_on_tier_change(mut self, callback: impl Fn(Tier) + Send + Sync + 'static) -> Self {
        self.on_tier_change = Some(Box::new(callback));
        self
    }

    /// Current local phase
    #[must_use]
    pub fn phase(&self) -> GatePhase {
        self.state.lock().phase
    }

    /// Check if a plan write is in flight
    #[must_use]
    pub fn is_upgrading(&self) -> bool {
        matches!(self.phase(), GatePhase::Upgrading { .. })
    }

    /// Check if the gate is still mounted
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted
    }

    /// Decide what to display for the caller's latest props
    #[must_use]
    pub fn render(&self, props: &GateProps) -> GateView {
        let signed_in = self.ctx.auth.current().is_some();
        let decision = props.requirement.evaluate(&props.current_plan);

        if signed_in && decision.has_access {
            return GateView::Granted;
        }

        let catalog = &self.ctx.catalog;
        let state = self.state.lock();
        tracing::debug!(
            feature = %props.requirement.feature_name,
            current = %decision.current_tier,
            required = %decision.required_tier,
            phase = ?state.phase,
            "gate render"
        );

        match state.phase {
            GatePhase::Confirmed { tier, remaining_secs } => GateView::Confirmed(ConfirmedView {
                feature_name: props.requirement.feature_name.clone(),
                tier,
                plan_name: catalog.name_of(tier),
                features: catalog.get(tier).map(|p| p.features.clone()).unwrap_or_default(),
                remaining_secs,
            }),
            GatePhase::Blocked | GatePhase::Upgrading { .. } => {
                let offers = if signed_in {
                    catalog
                        .upgrade_offers(decision.current_tier)
                        .into_iter()
                        .cloned()
                        .collect()
                } else {
                    Vec::new()
                };
                GateView::Blocked(BlockedView {
                    feature_name: props.requirement.feature_name.clone(),
                    required_tier: decision.required_tier,
                    required_plan: catalog.name_of(decision.required_tier),
                    current_tier: decision.current_tier,
                    current_plan: catalog.name_of(decision.current_tier),
                    offers,
                    upgrading_to: match state.phase {
                        GatePhase::Upgrading { target } => Some(target),
                        _ => None,
                    },
                    error: state.error.clone(),
                    signed_in,
                })
            }
        }
    }

    /// Purchase `target` for the signed-in account
    ///
    /// On success the callback and [`GateEvent::TierChanged`] fire before the
    /// gate enters the confirmation phase and starts its countdown. On failure
    /// the gate returns to the lock screen with the error attached, ready for
    /// another attempt. Nothing is retried automatically.
    ///
    /// # Errors
    /// - `GateError::UpgradeInFlight` while a previous call is pending
    /// - `GateError::Unauthenticated` when signed out (nothing is written)
    /// - `GateError::Unmounted` after [`unmount`](Self::unmount)
    /// - `GateError::Store` when the plan write fails
    pub async fn request_upgrade(&self, target: Tier) -> Result<(), GateError> {
        let identity = {
            let mut state = self.state.lock();
            if !state.mounted {
                return Err(GateError::Unmounted);
            }
            if matches!(state.phase, GatePhase::Upgrading { .. }) {
                return Err(GateError::UpgradeInFlight);
            }
            let Some(profile) = self.ctx.auth.current() else {
                let err = GateError::Unauthenticated;
                state.error = Some(err.user_message());
                tracing::warn!(%target, "upgrade attempted while signed out");
                return Err(err);
            };
            state.phase = GatePhase::Upgrading { target };
            state.error = None;
            profile.identity
        };

        tracing::info!(%identity, %target, "requesting plan upgrade");
        let mut in_flight = InFlight::new(&self.state);
        let result = self.ctx.service.set_plan(&identity, target).await;
        in_flight.disarm();

        match result {
            Ok(()) => {
                // Held through the callback so unmount cannot interleave
                let mut state = self.state.lock();
                if !state.mounted {
                    tracing::debug!(%identity, "upgrade stored after unmount, dropping result");
                    return Ok(());
                }

                // The page's copy must be current before the confirmation renders
                if let Some(callback) = &self.on_tier_change {
                    callback(target);
                }
                let _ = self.events.send(GateEvent::TierChanged(target));

                let countdown_secs = self.ctx.config.countdown_secs.max(1);
                state.phase = GatePhase::Confirmed {
                    tier: target,
                    remaining_secs: countdown_secs,
                };
                state.countdown = Some(Countdown::start(
                    countdown_secs,
                    self.ctx.config.tick(),
                    countdown_tick(Arc::downgrade(&self.state), self.events.clone()),
                ));
                Ok(())
            }
            Err(e) => {
                let err = GateError::from(e);
                tracing::warn!(%identity, %target, error = %err, "upgrade failed");
                let mut state = self.state.lock();
                if state.mounted {
                    state.phase = GatePhase::Blocked;
                    state.error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }

    /// Close the confirmation before the countdown ends
    ///
    /// Returns `false` when there was no confirmation to close.
    pub fn dismiss(&self) -> bool {
        if self.leave_confirmation() {
            let _ = self.events.send(GateEvent::Dismissed);
            true
        } else {
            false
        }
    }

    /// Close the confirmation and ask the page to refetch right away
    pub fn continue_to_feature(&self) -> bool {
        if self.leave_confirmation() {
            let _ = self.events.send(GateEvent::RefreshRequested);
            true
        } else {
            false
        }
    }

    fn leave_confirmation(&self) -> bool {
        let mut state = self.state.lock();
        if !matches!(state.phase, GatePhase::Confirmed { .. }) {
            return false;
        }
        state.phase = GatePhase::Blocked;
        if let Some(countdown) = state.countdown.take() {
            countdown.cancel();
        }
        true
    }

    /// Tear down the gate: cancel the countdown and ignore pending results
    pub fn unmount(&self) {
        let mut state = self.state.lock();
        if !state.mounted {
            return;
        }
        state.mounted = false;
        if let Some(countdown) = state.countdown.take() {
            countdown.cancel();
        }
        tracing::debug!(phase = ?state.phase, "gate unmounted");
    }
}

impl Drop for SubscriptionGate {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn countdown_tick(
    state: Weak<Mutex<GateState>>,
    events: mpsc::UnboundedSender<GateEvent>,
) -> impl FnMut(u32) -> ControlFlow<()> + Send + 'static {
    move |remaining| {
        let Some(state) = state.upgrade() else {
            return ControlFlow::Break(());
        };
        let mut state = state.lock();
        if !state.mounted {
            return ControlFlow::Break(());
        }
        let GatePhase::Confirmed { remaining_secs, .. } = &mut state.phase else {
            return ControlFlow::Break(());
        };
        *remaining_secs = remaining;
        let _ = events.send(GateEvent::CountdownTick { remaining_secs: remaining });

        if remaining == 0 {
            state.phase = GatePhase::Blocked;
            let _ = events.send(GateEvent::RefreshRequested);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// Puts the gate back on the lock screen if the upgrade future is dropped mid-write
struct InFlight<'a> {
    state: &'a Mutex<GateState>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<GateState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if matches!(state.phase, GatePhase::Upgrading { .. }) {
            state.phase = GatePhase::Blocked;
        }
    }
}
