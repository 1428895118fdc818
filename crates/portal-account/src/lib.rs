//! Portal Account - account records behind injected capabilities
//!
//! The document database and the auth provider are reached only through the
//! [`DocumentStore`] and [`AuthProvider`] traits, owned by the application's
//! composition root and handed to whoever needs them.
//!
//! - [`Account`] decodes raw documents once, with explicit defaults
//! - [`AccountService`] caches snapshots and invalidates them on writes
//! - [`SessionBootstrap`] ensures an account exists for every sign-in
//! - [`FundingApplications`] stores applications and their review trail
//! - [`AdminConsole`] gates administrator edits and reviews on the stored admin flag

#![warn(unreachable_pub)]

pub mod account;
pub mod admin;
pub mod auth;
pub mod error;
pub mod funding;
pub mod service;
pub mod session;
pub mod store;
pub mod types;

pub use account::{missing_fields, Account, ProfilePatch};
pub use admin::AdminConsole;
pub use auth::{AuthProvider, LocalAuth};
pub use error::{AccountError, AuthError, StoreError};
pub use funding::{
    status_counts, ApplicationForm, ApplicationStatus, FundingApplication, FundingApplications, Review,
    FUNDING_COLLECTION,
};
pub use service::AccountService;
pub use session::SessionBootstrap;
pub use store::{DocumentStore, MemoryStore};
pub use types::{AuthProfile, CacheConfig, Document, Identity, USERS_COLLECTION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
