//! In-memory product store.
//!
//! Products are kept in a map keyed by name. The existence check and the
//! insert share one write lock, which gives the same guarantee as a unique
//! constraint in a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{storable_price, ProductStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{CandidateRecord, StoredProduct};

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Stored products (name -> product)
    products: RwLock<HashMap<String, StoredProduct>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with some products already stored.
    pub fn with_products(products: impl IntoIterator<Item = StoredProduct>) -> Self {
        let products = products.into_iter().map(|p| (p.name.clone(), p)).collect();
        Self {
            products: RwLock::new(products),
        }
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.products.read().await.contains_key(name))
    }

    async fn create_if_absent(&self, record: &CandidateRecord) -> StoreResult<StoredProduct> {
        storable_price(record)?;

        let mut products = self.products.write().await;
        if products.contains_key(&record.name) {
            return Err(StoreError::Duplicate(record.name.clone()));
        }

        let stored = StoredProduct::from_candidate(record);
        products.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }

    async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
        let mut all: Vec<StoredProduct> = self.products.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let store = MemoryStore::new();
        let pen = CandidateRecord::new("Pen", "Blue", 1.5);

        let stored = store.create_if_absent(&pen).await.unwrap();
        assert_eq!(stored.name, "Pen");
        assert_eq!(stored.description.as_deref(), Some("Blue"));
        assert!(store.exists("Pen").await.unwrap());

        let err = store.create_if_absent(&pen).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref n) if n == "Pen"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_names_are_case_sensitive() {
        let store = MemoryStore::new();
        store.create_if_absent(&CandidateRecord::new("Pen", "", 1.0)).await.unwrap();

        assert!(!store.exists("pen").await.unwrap());
        assert!(store.create_if_absent(&CandidateRecord::new("pen", "", 1.0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_creates_store_one() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create_if_absent(&CandidateRecord::new("Lamp", "", 9.0))
                    .await
                    .is_ok()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_stored_in_cents() {
        let store = MemoryStore::new();

        let stored = store.create_if_absent(&CandidateRecord::new("Pen", "", 1.234)).await.unwrap();
        assert_eq!(stored.price, 1.23);
        assert_eq!(store.list_all().await.unwrap()[0].price, 1.23);

        let err = store
            .create_if_absent(&CandidateRecord::new("Dust", "", 0.004))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(!store.exists("Dust").await.unwrap());
    }

    #[tokio::test]
    async fn test_with_products_seeds_store() {
        let existing = StoredProduct::from_candidate(&CandidateRecord::new("Existing", "", 8.0));
        let store = MemoryStore::with_products([existing]);
        assert!(store.exists("Existing").await.unwrap());
        assert!(!store.is_empty().await);
    }
}
