//! Document store seam
//!
//! The hosted document database is reached only through [`DocumentStore`].
//! Writes become visible eventually; callers must not assume read-your-write.

use crate::error::StoreError;
use crate::types::Document;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

/// Keyed document database capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` when absent
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document under a fresh id, returning the id
    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError>;

    /// Create or merge fields into a document
    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Overwrite one field of an existing document
    ///
    /// # Errors
    /// `StoreError::NotFound` when the document does not exist.
    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// All documents of a collection as `(id, document)` pairs
    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;
}

/// In-process document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: DashMap<(String, String), Document>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if store holds no documents
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_string(), id.to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.get(&Self::key(collection, id)).map(|d| d.clone()))
    }

    async fn add(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.docs.insert(Self::key(collection, &id), fields);
        Ok(id)
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.docs
            .entry(Self::key(collection, id))
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut doc = self
            .docs
            .get_mut(&Self::key(collection, id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        doc.insert(field.to_string(), value);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let mut docs: Vec<(String, Document)> = self
            .docs
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn set_merge_keeps_other_fields() {
        let store = MemoryStore::new();
        store.set_merge("users", "u1", fields(json!({"a": 1, "b": 2}))).await.unwrap();
        store.set_merge("users", "u1", fields(json!({"b": 3}))).await.unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.get("a"), Some(&json!(1)));
        assert_eq!(doc.get("b"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn update_field_requires_document() {
        let store = MemoryStore::new();
        let err = store.update_field("users", "ghost", "plan", json!("2")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn add_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = store.add("funding", fields(json!({"n": 1}))).await.unwrap();
        let b = store.add("funding", fields(json!({"n": 2}))).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.get("funding", &b).await.unwrap().unwrap().get("n"), Some(&json!(2)));
        assert_eq!(store.list("funding").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_is_scoped_and_sorted() {
        let store = MemoryStore::new();
        store.set_merge("users", "b", Document::new()).await.unwrap();
        store.set_merge("users", "a", Document::new()).await.unwrap();
        store.set_merge("applications", "x", Document::new()).await.unwrap();

        let ids: Vec<_> = store.list("users").await.unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(store.len(), 3);
    }
}
