//! PostgreSQL product store.
//!
//! The `products` table carries a `UNIQUE (name)` constraint; that constraint,
//! not the gateway's pre-check, is what keeps two same-named products out.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{storable_price, ProductStore};
use crate::error::{database_detail, StoreError, StoreResult};
use crate::models::{CandidateRecord, StoredProduct};

/// Bound on waiting for a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: f64,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for StoredProduct {
    fn from(row: ProductRow) -> Self {
        StoredProduct {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

/// Check if the error is a unique constraint violation
fn is_unique_violation(error: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = error {
        return db_err.is_unique_violation();
    }
    false
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("PostgreSQL product store ready");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }

    async fn create_if_absent(&self, record: &CandidateRecord) -> StoreResult<StoredProduct> {
        let price = storable_price(record)?;
        let description = (!record.description.is_empty()).then_some(record.description.as_str());

        let inserted: Option<ProductRow> = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, description, price)
            VALUES ($1, $2, $3, CAST($4 AS NUMERIC(10, 2)))
            ON CONFLICT (name) DO NOTHING
            RETURNING id, name, description, price::float8 AS price, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.name)
        .bind(description)
        .bind(format!("{:.2}", price))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(record.name.clone())
            } else {
                StoreError::Storage(database_detail(&e))
            }
        })?;

        inserted
            .map(StoredProduct::from)
            .ok_or_else(|| StoreError::Duplicate(record.name.clone()))
    }

    async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, price::float8 AS price, created_at
            FROM products
            ORDER BY created_at, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredProduct::from).collect())
    }
}
