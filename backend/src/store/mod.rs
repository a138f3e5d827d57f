//! Product storage.
//!
//! - [`ProductStore`] - what a storage adapter must offer
//! - [`MemoryStore`] - process-local adapter (CLI runs and tests)
//! - [`PgStore`] - PostgreSQL adapter
//! - [`ProductGateway`] - per-record create with duplicate detection, and the
//!   [`PersistBatch`] capability the importer persists through
//!
//! Uniqueness of `name` is ultimately enforced by the adapter itself:
//! `create_if_absent` must refuse a duplicate even when the gateway's
//! existence pre-check raced with another writer.

pub mod gateway;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::models::{round_to_cents, CandidateRecord, PersistOutcome, StoredProduct, MAX_STORED_PRICE};

pub use gateway::ProductGateway;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage adapter interface.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Whether a product with exactly this name is stored.
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Store `record` unless its name is taken.
    ///
    /// Returns [`crate::error::StoreError::Duplicate`] when it is.
    async fn create_if_absent(&self, record: &CandidateRecord) -> StoreResult<StoredProduct>;

    /// Every stored product.
    async fn list_all(&self) -> StoreResult<Vec<StoredProduct>>;
}

/// Anything that can persist a sequence of validated records, one at a time,
/// reporting each failure instead of aborting.
#[async_trait]
pub trait PersistBatch: Send + Sync {
    async fn create_batch(&self, records: Vec<CandidateRecord>) -> PersistOutcome;
}

/// The price as every adapter stores it: rounded to cents, above zero and
/// within `NUMERIC(10, 2)`.
pub(crate) fn storable_price(record: &CandidateRecord) -> StoreResult<f64> {
    let price = round_to_cents(record.price);
    if price > 0.0 && price <= MAX_STORED_PRICE {
        Ok(price)
    } else {
        Err(StoreError::Storage(format!(
            "Price {} of '{}' cannot be stored: it must round to a value between 0.01 and {:.2}",
            record.price, record.name, MAX_STORED_PRICE
        )))
    }
}
