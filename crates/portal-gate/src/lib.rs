//! Portal Gate - subscription gating for feature pages
//!
//! Wraps a protected page section and decides, on every render, whether to
//! show the content, a lock screen with upgrade offers, or an upgrade
//! confirmation. Upgrades write the new plan through the account service and
//! notify the hosting page so it can update its own copy immediately.
//!
//! # Example
//!
//! ```rust,ignore
//! use portal_gate::{GateContext, GateProps};
//! use portal_access::{FeatureRequirement, Tier};
//!
//! # async fn example(ctx: GateContext) -> Result<(), Box<dyn std::error::Error>> {
//! let (gate, mut events) = ctx.mount();
//! let props = GateProps::new("none", FeatureRequirement::new("Business Workshops", Tier::STANDARD));
//!
//! if !gate.render(&props).is_granted() {
//!     gate.request_upgrade(Tier::STANDARD).await?;
//! }
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod countdown;
pub mod error;
pub mod gate;
pub mod types;

pub use countdown::Countdown;
pub use error::GateError;
pub use gate::{GateContext, SubscriptionGate, TierCallback};
pub use types::{BlockedView, ConfirmedView, GateConfig, GateEvent, GatePhase, GateProps, GateView};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
