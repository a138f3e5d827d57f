//! Persistence gateway.
//!
//! Creates products one at a time through a [`ProductStore`]. A batch is a
//! sequence of independent single-record creates: one failure never stops or
//! undoes the others.

use std::sync::Arc;

use async_trait::async_trait;

use super::{PersistBatch, ProductStore};
use crate::api::logs::ImportLog;
use crate::error::{GatewayError, StoreResult};
use crate::models::{BatchItemError, CandidateRecord, PersistOutcome, StoredProduct};

#[derive(Clone)]
pub struct ProductGateway {
    store: Arc<dyn ProductStore>,
    log: ImportLog,
}

impl ProductGateway {
    pub fn new(store: Arc<dyn ProductStore>, log: ImportLog) -> Self {
        Self { store, log }
    }

    /// Create one product.
    ///
    /// The existence check only saves a write in the common case; a duplicate
    /// that slips past it is still refused by the store and reported the same
    /// way.
    #[tracing::instrument(skip(self, record), fields(name = %record.name))]
    pub async fn create(&self, record: &CandidateRecord) -> Result<StoredProduct, GatewayError> {
        if self.store.exists(&record.name).await? {
            return Err(GatewayError::DuplicateName(record.name.clone()));
        }

        let stored = self.store.create_if_absent(record).await?;
        tracing::debug!(id = %stored.id, "Product stored");
        Ok(stored)
    }

    pub async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
        self.store.list_all().await
    }
}

#[async_trait]
impl PersistBatch for ProductGateway {
    async fn create_batch(&self, records: Vec<CandidateRecord>) -> PersistOutcome {
        let mut outcome = PersistOutcome::default();

        // Sequential: two same-named rows in one batch must not
        // both pass the existence check.
        for record in records {
            match self.create(&record).await {
                Ok(_) => outcome.success_count += 1,
                Err(err) => {
                    self.log.warning(format!("Failed to store product '{}': {}", record.name, err));
                    outcome.errors.push(BatchItemError::rejected(record, err.to_string()));
                }
            }
        }

        self.log.info(format!(
            "Batch persistence finished: {} stored, {} failed",
            outcome.success_count,
            outcome.errors.len()
        ));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;

    /// Store whose pre-check always says "absent", as if it lost a race.
    struct RacingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ProductStore for RacingStore {
        async fn exists(&self, _name: &str) -> StoreResult<bool> {
            Ok(false)
        }

        async fn create_if_absent(&self, record: &CandidateRecord) -> StoreResult<StoredProduct> {
            self.inner.create_if_absent(record).await
        }

        async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
            self.inner.list_all().await
        }
    }

    /// Store that is unreachable for one specific product name.
    struct FlakyStore {
        inner: MemoryStore,
        broken_name: &'static str,
    }

    #[async_trait]
    impl ProductStore for FlakyStore {
        async fn exists(&self, name: &str) -> StoreResult<bool> {
            self.inner.exists(name).await
        }

        async fn create_if_absent(&self, record: &CandidateRecord) -> StoreResult<StoredProduct> {
            if record.name == self.broken_name {
                return Err(StoreError::Storage("connection reset by peer".into()));
            }
            self.inner.create_if_absent(record).await
        }

        async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
            self.inner.list_all().await
        }
    }

    fn gateway(store: impl ProductStore + 'static) -> ProductGateway {
        ProductGateway::new(Arc::new(store), ImportLog::new())
    }

    fn record(name: &str) -> CandidateRecord {
        CandidateRecord::new(name, "", 1.0)
    }

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let gw = gateway(MemoryStore::new());

        let stored = gw.create(&record("Pen")).await.unwrap();
        assert_eq!(stored.name, "Pen");

        let err = gw.create(&record("Pen")).await.unwrap_err();
        assert_eq!(err, GatewayError::DuplicateName("Pen".into()));
    }

    #[tokio::test]
    async fn test_store_constraint_catches_missed_precheck() {
        let gw = gateway(RacingStore { inner: MemoryStore::new() });

        gw.create(&record("Pen")).await.unwrap();
        let err = gw.create(&record("Pen")).await.unwrap_err();
        assert_eq!(err, GatewayError::DuplicateName("Pen".into()));
    }

    #[tokio::test]
    async fn test_batch_counts_add_up() {
        let gw = gateway(MemoryStore::new());
        let records = vec![record("A"), record("B"), record("A"), record("C")];

        let outcome = gw.create_batch(records.clone()).await;
        assert_eq!(outcome.success_count + outcome.errors.len(), records.len());
        assert_eq!(outcome.success_count, 3);
        assert_eq!(outcome.errors[0].item.name, "A");
        assert!(outcome.errors[0].reason.contains("already exists"));
        assert!(outcome.errors[0].violations.is_none());
    }

    #[tokio::test]
    async fn test_storage_fault_does_not_abort_batch() {
        let gw = gateway(FlakyStore {
            inner: MemoryStore::new(),
            broken_name: "B",
        });

        let outcome = gw.create_batch(vec![record("A"), record("B"), record("C")]).await;
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].reason, "connection reset by peer");

        let names: Vec<String> = gw.list_all().await.unwrap().into_iter().map(|p| p.name).collect();
        assert!(names.contains(&"A".to_string()));
        assert!(names.contains(&"C".to_string()));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let gw = gateway(MemoryStore::new());
        assert_eq!(gw.create_batch(Vec::new()).await, PersistOutcome::default());
    }
}
