//! Session bootstrap
//!
//! Follows the auth provider's session channel, runs
//! [`AccountService::ensure_account`] once per sign-in, and republishes the
//! resulting account snapshot for pages to read.

use crate::account::Account;
use crate::auth::AuthProvider;
use crate::error::{AccountError, AuthError};
use crate::service::AccountService;
use crate::types::AuthProfile;
use portal_access::{PlanValue, Tier};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background task keeping the signed-in account snapshot current
pub struct SessionBootstrap {
    auth: Arc<dyn AuthProvider>,
    service: Arc<AccountService>,
    accounts: watch::Sender<Option<Account>>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for SessionBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBootstrap")
            .field("signed_in", &self.accounts.borrow().is_some())
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

impl SessionBootstrap {
    /// Start following session changes
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(auth: Arc<dyn AuthProvider>, service: Arc<AccountService>) -> Self {
        let (accounts, _) = watch::channel(None);
        let task = tokio::spawn(follow_sessions(
            auth.sessions(),
            service.clone(),
            accounts.clone(),
        ));
        Self {
            auth,
            service,
            accounts,
            task,
        }
    }

    /// Subscribe to account snapshots
    #[must_use]
    pub fn accounts(&self) -> watch::Receiver<Option<Account>> {
        self.accounts.subscribe()
    }

    /// Latest snapshot, `None` while signed out or still loading
    #[must_use]
    pub fn current(&self) -> Option<Account> {
        self.accounts.borrow().clone()
    }

    /// Refetch the signed-in account and publish it
    ///
    /// # Errors
    /// `AuthError::NotSignedIn` without a session, or a store failure.
    pub async fn refresh(&self) -> Result<Option<Account>, AccountError> {
        let profile = self.auth.current().ok_or(AuthError::NotSignedIn)?;
        let account = self.service.refresh_account(&profile.identity).await?;
        self.accounts.send_replace(account.clone());
        Ok(account)
    }

    /// Overwrite the snapshot's plan without waiting for a store read
    pub fn apply_local_tier(&self, tier: Tier) {
        self.accounts.send_if_modified(|snapshot| match snapshot {
            Some(account) => {
                account.plan = PlanValue::from(tier.to_plan_string());
                true
            }
            None => false,
        });
    }
}

impl Drop for SessionBootstrap {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn follow_sessions(
    mut sessions: watch::Receiver<Option<AuthProfile>>,
    service: Arc<AccountService>,
    accounts: watch::Sender<Option<Account>>,
) {
    loop {
        let profile = sessions.borrow_and_update().clone();
        let account = match profile {
            Some(profile) => Some(load_account(&service, &profile).await),
            None => None,
        };
        accounts.send_replace(account);

        if sessions.changed().await.is_err() {
            tracing::debug!("auth provider dropped, session bootstrap stopping");
            break;
        }
    }
}

async fn load_account(service: &AccountService, profile: &AuthProfile) -> Account {
    match service.ensure_account(profile).await {
        Ok(account) => account,
        Err(e) => {
            tracing::warn!(identity = %profile.identity, error = %e, "account bootstrap failed, using defaults");
            Account::new_for(profile)
        }
    }
}
