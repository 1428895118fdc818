//! Administrator console
//!
//! Every operation re-reads the acting account from the store and fails
//! closed unless it carries `isAdmin == true`. Funding reviews are signed
//! with that freshly read record.

use crate::account::{Account, ProfilePatch};
use crate::error::AccountError;
use crate::funding::{status_counts, ApplicationStatus, FundingApplication, FundingApplications, Review};
use crate::service::AccountService;
use crate::types::Identity;
use portal_access::Tier;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Admin operations on behalf of one acting identity
#[derive(Debug, Clone)]
pub struct AdminConsole {
    service: Arc<AccountService>,
    applications: FundingApplications,
    actor: Identity,
}

impl AdminConsole {
    /// Open console for `actor`, checking admin rights once up front
    ///
    /// # Errors
    /// `AccountError::Forbidden` when `actor` is not an administrator.
    pub async fn open(service: Arc<AccountService>, actor: Identity) -> Result<Self, AccountError> {
        let applications = FundingApplications::new(service.store().clone());
        let console = Self {
            service,
            applications,
            actor,
        };
        console.authorize().await?;
        Ok(console)
    }

    /// Acting identity
    #[inline]
    #[must_use]
    pub fn actor(&self) -> &Identity {
        &self.actor
    }

    async fn authorize(&self) -> Result<Account, AccountError> {
        match self.service.refresh_account(&self.actor).await? {
            Some(account) if account.is_admin => Ok(account),
            _ => {
                tracing::warn!(actor = %self.actor, "admin operation refused");
                Err(AccountError::Forbidden(self.actor.clone()))
            }
        }
    }

    /// Every account record
    ///
    /// # Errors
    /// `Forbidden` or a store failure.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AccountError> {
        self.authorize().await?;
        self.service.list_accounts().await
    }

    /// Set another account's plan directly
    ///
    /// # Errors
    /// `Forbidden`, `NotFound` or a store failure.
    pub async fn set_plan(&self, target: &Identity, tier: Tier) -> Result<(), AccountError> {
        self.authorize().await?;
        tracing::info!(actor = %self.actor, %target, %tier, "admin plan change");
        self.service.set_plan(target, tier).await
    }

    /// Edit another account's profile fields
    ///
    /// # Errors
    /// `Forbidden`, `NotFound` or a store failure.
    pub async fn update_profile(&self, target: &Identity, patch: &ProfilePatch) -> Result<(), AccountError> {
        self.authorize().await?;
        tracing::info!(actor = %self.actor, %target, "admin profile edit");
        self.service.update_profile(target, patch).await
    }

    /// Funding applications, newest first, optionally one status only
    ///
    /// # Errors
    /// `Forbidden` or a store failure.
    pub async fn list_applications(
        &self,
        filter: Option<ApplicationStatus>,
    ) -> Result<Vec<FundingApplication>, AccountError> {
        self.authorize().await?;
        self.applications.list(filter).await
    }

    /// Application count per status
    ///
    /// # Errors
    /// `Forbidden` or a store failure.
    pub async fn application_counts(&self) -> Result<BTreeMap<ApplicationStatus, usize>, AccountError> {
        self.authorize().await?;
        Ok(status_counts(&self.applications.list(None).await?))
    }

    /// Review one funding application as the acting administrator
    ///
    /// # Errors
    /// `Forbidden`, `ApplicationNotFound`, `InvalidTransition`,
    /// `FeedbackRequired` or a store failure.
    pub async fn review_application(&self, id: &str, review: &Review) -> Result<FundingApplication, AccountError> {
        let reviewer = self.authorize().await?;
        self.applications.review(id, &reviewer, review).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funding::ApplicationForm;
    use crate::store::{DocumentStore, MemoryStore};
    use crate::types::{AuthProfile, CacheConfig, USERS_COLLECTION};
    use serde_json::json;

    async fn setup() -> (Arc<MemoryStore>, Arc<AccountService>) {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(AccountService::new(store.clone(), &CacheConfig::default()));
        service.ensure_account(&AuthProfile::new("admin")).await.unwrap();
        service.ensure_account(&AuthProfile::new("owner")).await.unwrap();
        store
            .update_field(USERS_COLLECTION, "admin", "isAdmin", json!(true))
            .await
            .unwrap();
        (store, service)
    }

    #[tokio::test]
    async fn non_admin_is_refused() {
        let (_, service) = setup().await;
        let err = AdminConsole::open(service, Identity::new("owner")).await.unwrap_err();
        assert!(matches!(err, AccountError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unknown_actor_is_refused() {
        let (_, service) = setup().await;
        assert!(AdminConsole::open(service, Identity::new("ghost")).await.is_err());
    }

    #[tokio::test]
    async fn admin_sets_plan() {
        let (_, service) = setup().await;
        let console = AdminConsole::open(service.clone(), Identity::new("admin")).await.unwrap();
        let owner = Identity::new("owner");

        service.get_account(&owner).await.unwrap();
        console.set_plan(&owner, Tier::STANDARD).await.unwrap();
        assert_eq!(service.get_account(&owner).await.unwrap().unwrap().tier(), Tier::STANDARD);
        assert_eq!(console.list_accounts().await.unwrap().len(), 2);
    }

    fn form() -> ApplicationForm {
        ApplicationForm {
            business_name: "Spaza".into(),
            category: "Retail".into(),
            description: "Stock".into(),
            address: "1 Long Street".into(),
            number: "0820000000".into(),
        }
    }

    #[tokio::test]
    async fn admin_reviews_application() {
        let (store, service) = setup().await;
        store
            .update_field(USERS_COLLECTION, "admin", "displayName", json!("Grace Admin"))
            .await
            .unwrap();
        let applications = FundingApplications::new(store.clone());
        let submitted = applications.submit(&AuthProfile::new("owner"), &form()).await.unwrap();
        let console = AdminConsole::open(service, Identity::new("admin")).await.unwrap();

        let counts = console.application_counts().await.unwrap();
        assert_eq!(counts[&ApplicationStatus::Pending], 1);

        let reviewed = console
            .review_application(&submitted.id, &Review::new(ApplicationStatus::Approved, "Well prepared"))
            .await
            .unwrap();
        assert_eq!(reviewed.status, ApplicationStatus::Approved);
        assert_eq!(reviewed.reviewer_name, "Grace Admin");
        assert_eq!(reviewed.reviewer_id, Some(Identity::new("admin")));

        assert!(console.list_applications(Some(ApplicationStatus::Pending)).await.unwrap().is_empty());
        assert_eq!(console.list_applications(Some(ApplicationStatus::Approved)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn revoked_admin_cannot_review() {
        let (store, service) = setup().await;
        let applications = FundingApplications::new(store.clone());
        let submitted = applications.submit(&AuthProfile::new("owner"), &form()).await.unwrap();
        let console = AdminConsole::open(service, Identity::new("admin")).await.unwrap();

        store
            .update_field(USERS_COLLECTION, "admin", "isAdmin", json!(false))
            .await
            .unwrap();
        let err = console
            .review_application(&submitted.id, &Review::new(ApplicationStatus::Rejected, "No"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Forbidden(_)));
        let stored = applications.get(&submitted.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Pending);
    }

    #[tokio::test]
    async fn revoked_admin_loses_access() {
        let (store, service) = setup().await;
        let console = AdminConsole::open(service, Identity::new("admin")).await.unwrap();

        store
            .update_field(USERS_COLLECTION, "admin", "isAdmin", json!(false))
            .await
            .unwrap();
        let patch = ProfilePatch {
            gender: Some("female".into()),
            ..ProfilePatch::default()
        };
        assert!(matches!(
            console.update_profile(&Identity::new("owner"), &patch).await,
            Err(AccountError::Forbidden(_))
        ));
    }
}
