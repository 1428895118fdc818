//! Composition root
//!
//! Builds the capability graph once: auth provider, document store, account
//! service, session bootstrap and the gate context handed to every page.

use crate::config::PortalConfig;
use crate::error::{AppError, Result};
use portal_access::PlanCatalog;
use portal_account::{
    Account, AccountService, AuthProfile, AuthProvider, DocumentStore, FundingApplications, LocalAuth,
    MemoryStore, SessionBootstrap,
};
use portal_gate::GateContext;
use std::sync::Arc;

/// Wired application services
pub struct App {
    config: PortalConfig,
    auth: Arc<LocalAuth>,
    service: Arc<AccountService>,
    session: Arc<SessionBootstrap>,
    gates: GateContext,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Wire the in-memory backends
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(config: PortalConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Wire against a given document store
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn with_store(config: PortalConfig, store: Arc<dyn DocumentStore>) -> Self {
        let auth = Arc::new(LocalAuth::new());
        let service = Arc::new(AccountService::new(store, &config.cache));
        let session = Arc::new(SessionBootstrap::spawn(auth.clone(), service.clone()));
        let gates = GateContext::new(service.clone(), auth.clone())
            .with_catalog(config.catalog())
            .with_config(config.gate);

        tracing::debug!(plans = config.catalog().plans().len(), "application wired");
        Self {
            config,
            auth,
            service,
            session,
            gates,
        }
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Auth provider
    #[must_use]
    pub fn auth(&self) -> &Arc<LocalAuth> {
        &self.auth
    }

    /// Account service
    #[must_use]
    pub fn service(&self) -> &Arc<AccountService> {
        &self.service
    }

    /// Session bootstrap publishing the signed-in account
    #[must_use]
    pub fn session(&self) -> &Arc<SessionBootstrap> {
        &self.session
    }

    /// Gate context for mounting gates
    #[must_use]
    pub fn gates(&self) -> &GateContext {
        &self.gates
    }

    /// Funding applications over the same store as the accounts
    #[must_use]
    pub fn applications(&self) -> FundingApplications {
        FundingApplications::new(self.service.store().clone())
    }

    /// Plan catalog
    #[must_use]
    pub fn catalog(&self) -> &PlanCatalog {
        self.gates.catalog()
    }

    /// Sign in and wait for the bootstrap to publish the account
    ///
    /// # Errors
    /// Auth failures, or `AppError::SessionClosed` if the bootstrap stops first.
    pub async fn sign_in(&self, profile: AuthProfile) -> Result<Account> {
        let identity = profile.identity.clone();
        let mut accounts = self.session.accounts();
        self.auth
            .sign_in(profile)
            .await
            .map_err(portal_account::AccountError::from)?;

        let account = accounts
            .wait_for(|snapshot| snapshot.as_ref().is_some_and(|a| a.identity == identity))
            .await
            .map_err(|_| AppError::SessionClosed)?
            .clone();
        account.ok_or(AppError::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_access::{PlanValue, Tier};

    #[tokio::test]
    async fn sign_in_creates_free_account() {
        let app = App::new(PortalConfig::default());
        let account = app
            .sign_in(AuthProfile::new("owner").with_email("owner@example.com"))
            .await
            .unwrap();

        assert_eq!(account.email, "owner@example.com");
        assert_eq!(account.tier(), Tier::FREE);
        assert_eq!(app.session().current(), Some(account));
    }

    #[tokio::test]
    async fn empty_subject_is_rejected() {
        let app = App::new(PortalConfig::default());
        let err = app.sign_in(AuthProfile::new("")).await.unwrap_err();
        assert!(matches!(err, AppError::Account(_)));
    }

    #[tokio::test]
    async fn local_tier_reaches_snapshot() {
        let app = App::new(PortalConfig::default());
        app.sign_in(AuthProfile::new("owner")).await.unwrap();

        app.session().apply_local_tier(Tier::PREMIUM);
        let plan = app.session().current().map(|a| a.plan);
        assert_eq!(plan, Some(PlanValue::from("2")));
    }
}
