//! Testing utilities for the portal workspace
//!
//! Shared test helpers, fixtures, and failure-injecting stores.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use portal_access::{FeatureRequirement, Tier};
use portal_account::{
    AccountService, AuthProfile, CacheConfig, Document, DocumentStore, LocalAuth,
    MemoryStore, StoreError, USERS_COLLECTION,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

/// Store whose writes can be made to fail on demand
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    write_error: Mutex<Option<StoreError>>,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following write fails with `error`
    pub fn fail_writes(&self, error: StoreError) {
        *self.write_error.lock() = Some(error);
    }

    /// Writes succeed again
    pub fn heal(&self) {
        *self.write_error.lock() = None;
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), StoreError> {
        match self.write_error.lock().clone() {
            Some(err) => Err(err),
            None => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        self.check_write()?;
        self.inner.add(collection, fields).await
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.set_merge(collection, id, fields).await
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.update_field(collection, id, field, value).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        self.inner.list(collection).await
    }
}

/// Store whose field updates wait until the test releases them
#[derive(Debug)]
pub struct GatedStore {
    inner: MemoryStore,
    permits: Semaphore,
    started: Notify,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            permits: Semaphore::new(0),
            started: Notify::new(),
        }
    }

    /// Let one pending update through
    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    /// Wait until an update has started
    pub async fn wait_for_write(&self) {
        self.started.notified().await;
    }
}

impl Default for GatedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        self.inner.add(collection, fields).await
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.inner.set_merge(collection, id, fields).await
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.started.notify_one();
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("gate closed".to_string()))?;
        permit.forget();
        self.inner.update_field(collection, id, field, value).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        self.inner.list(collection).await
    }
}

/// Write an account record with the given raw plan
pub async fn seed_account(store: &dyn DocumentStore, identity: &str, plan: Value) {
    let mut doc = Document::new();
    doc.insert("email".into(), format!("{identity}@example.com").into());
    doc.insert("displayName".into(), identity.into());
    doc.insert("isAdmin".into(), false.into());
    doc.insert("plan".into(), plan);
    store
        .set_merge(USERS_COLLECTION, identity, doc)
        .await
        .expect("seeding account");
}

/// Account service over `store` with default caching
pub fn service_over(store: Arc<dyn DocumentStore>) -> Arc<AccountService> {
    Arc::new(AccountService::new(store, &CacheConfig::default()))
}

/// Auth provider with `identity` signed in
pub fn signed_in(identity: &str) -> Arc<LocalAuth> {
    Arc::new(LocalAuth::signed_in(
        AuthProfile::new(identity).with_email(format!("{identity}@example.com")),
    ))
}

/// Auth provider with nobody signed in
pub fn signed_out() -> Arc<LocalAuth> {
    Arc::new(LocalAuth::new())
}

/// Stored plan of an account, read past any cache
pub async fn stored_plan(store: &dyn DocumentStore, identity: &str) -> Option<Value> {
    store
        .get(USERS_COLLECTION, identity)
        .await
        .ok()
        .flatten()
        .and_then(|doc| doc.get("plan").cloned())
}

/// Requirement for a feature at `level`
pub fn requirement(feature: &str, level: u32) -> FeatureRequirement {
    FeatureRequirement::new(feature, Tier::new(level))
}
