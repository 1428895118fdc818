//! Account service
//!
//! Wraps the [`DocumentStore`] with:
//! - Typed account reads through a moka snapshot cache
//! - Plan and profile writes that invalidate the cached snapshot
//!
//! Each write bumps a per-identity generation. A load only caches what it
//! read if no write landed while it was reading, so a slow read can never
//! put a pre-write snapshot back after the invalidation.
//! - Idempotent account bootstrap on sign-in
//! - Uncached entitlement re-checks for privileged operations

use crate::account::{missing_fields, Account, ProfilePatch};
use crate::error::AccountError;
use crate::store::DocumentStore;
use crate::types::{fields, AuthProfile, CacheConfig, Document, Identity, USERS_COLLECTION};
use chrono::Utc;
use dashmap::DashMap;
use moka::future::Cache;
use portal_access::{FeatureRequirement, GateDecision, PlanValue, Tier};
use serde_json::Value;
use std::sync::Arc;

/// Typed access to account records
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    cache: Cache<Identity, Account>,
    generations: Arc<DashMap<Identity, u64>>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Create service over a store
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            cache: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl())
                .build(),
            generations: Arc::new(DashMap::new()),
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Read an account, serving cached snapshots when present
    ///
    /// # Errors
    /// Propagates store read failures.
    pub async fn get_account(&self, identity: &Identity) -> Result<Option<Account>, AccountError> {
        if let Some(account) = self.cache.get(identity).await {
            tracing::debug!(%identity, "account cache hit");
            return Ok(Some(account));
        }
        self.refresh_account(identity).await
    }

    /// Read an account from the store, replacing any cached snapshot
    ///
    /// # Errors
    /// Propagates store read failures.
    pub async fn refresh_account(&self, identity: &Identity) -> Result<Option<Account>, AccountError> {
        let generation = self.generation(identity);
        let doc = self.store.get(USERS_COLLECTION, identity.as_str()).await?;
        match doc {
            Some(doc) => {
                let account = Account::decode(identity.clone(), &doc);
                self.cache_if_current(identity, generation, &account).await;
                Ok(Some(account))
            }
            None => {
                self.cache.invalidate(identity).await;
                Ok(None)
            }
        }
    }

    /// Overwrite one field of an account record
    ///
    /// # Errors
    /// `StoreError::NotFound` when the record does not exist, or any write failure.
    pub async fn update_account_field(
        &self,
        identity: &Identity,
        field: &str,
        value: Value,
    ) -> Result<(), AccountError> {
        self.store
            .update_field(USERS_COLLECTION, identity.as_str(), field, value)
            .await?;
        self.invalidate(identity).await;
        Ok(())
    }

    /// Store a new plan tier for an account
    ///
    /// # Errors
    /// Propagates the write failure; the cache is left untouched on error.
    pub async fn set_plan(&self, identity: &Identity, tier: Tier) -> Result<(), AccountError> {
        self.update_account_field(identity, fields::PLAN, tier.to_plan_string().into())
            .await
            .inspect_err(|e| tracing::warn!(%identity, %tier, error = %e, "plan update failed"))?;
        tracing::info!(%identity, %tier, "plan updated");
        Ok(())
    }

    /// Apply a profile edit and stamp `updatedAt`
    ///
    /// # Errors
    /// `AccountError::NotFound` when the record does not exist, or any store failure.
    pub async fn update_profile(&self, identity: &Identity, patch: &ProfilePatch) -> Result<(), AccountError> {
        if self.store.get(USERS_COLLECTION, identity.as_str()).await?.is_none() {
            return Err(AccountError::NotFound(identity.clone()));
        }
        let mut doc = patch.to_document();
        doc.insert(fields::UPDATED_AT.into(), Utc::now().to_rfc3339().into());
        self.store
            .set_merge(USERS_COLLECTION, identity.as_str(), doc)
            .await?;
        self.invalidate(identity).await;
        tracing::info!(%identity, "profile updated");
        Ok(())
    }

    /// Drop any cached snapshot of an account
    ///
    /// Loads already reading the account will not cache their result. Safe to
    /// call repeatedly.
    pub async fn invalidate(&self, identity: &Identity) {
        *self.generations.entry(identity.clone()).or_insert(0) += 1;
        self.cache.invalidate(identity).await;
    }

    fn generation(&self, identity: &Identity) -> u64 {
        self.generations.get(identity).map_or(0, |g| *g)
    }

    async fn cache_if_current(&self, identity: &Identity, generation: u64, account: &Account) {
        if self.generation(identity) == generation {
            self.cache.insert(identity.clone(), account.clone()).await;
        } else {
            tracing::debug!(%identity, "account changed during load, not caching");
        }
    }

    /// Create the account with defaults, or fill in missing fields
    ///
    /// Stamps `lastLogin` every time. Calling it twice for the same profile
    /// leaves the record as a single call would.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn ensure_account(&self, profile: &AuthProfile) -> Result<Account, AccountError> {
        let identity = &profile.identity;
        let existing = self.store.get(USERS_COLLECTION, identity.as_str()).await?;

        let mut patch = match &existing {
            Some(doc) => missing_fields(doc, profile),
            None => {
                tracing::info!(%identity, "creating account");
                Account::new_for(profile).to_document()
            }
        };
        patch.insert(fields::LAST_LOGIN.into(), Utc::now().to_rfc3339().into());

        self.store
            .set_merge(USERS_COLLECTION, identity.as_str(), patch.clone())
            .await?;

        let mut merged: Document = existing.unwrap_or_default();
        merged.extend(patch);
        let account = Account::decode(identity.clone(), &merged);
        self.invalidate(identity).await;
        self.cache.insert(identity.clone(), account.clone()).await;
        Ok(account)
    }

    /// All accounts, sorted by display name
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AccountError> {
        let mut accounts: Vec<Account> = self
            .store
            .list(USERS_COLLECTION)
            .await?
            .into_iter()
            .map(|(id, doc)| Account::decode(Identity::new(id), &doc))
            .collect();
        accounts.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.identity.cmp(&b.identity))
        });
        Ok(accounts)
    }

    /// Re-check a feature entitlement against the stored record
    ///
    /// Reads past the cache so a stale snapshot cannot grant access. A missing
    /// record counts as the free tier.
    ///
    /// # Errors
    /// `AccountError::Entitlement` when the stored tier is too low.
    pub async fn authorize_feature(
        &self,
        identity: &Identity,
        requirement: &FeatureRequirement,
    ) -> Result<GateDecision, AccountError> {
        let plan = self
            .refresh_account(identity)
            .await?
            .map_or(PlanValue::Missing, |a| a.plan);
        let decision = requirement.evaluate(&plan);

        if decision.has_access {
            Ok(decision)
        } else {
            tracing::warn!(
                %identity,
                feature = %requirement.feature_name,
                required = %decision.required_tier,
                current = %decision.current_tier,
                "entitlement denied"
            );
            Err(AccountError::Entitlement {
                feature: requirement.feature_name.clone(),
                required: decision.required_tier,
                current: decision.current_tier,
            })
        }
    }
}
