//! # Prodload - bulk CSV import of product catalogs
//!
//! Prodload ingests delimited-text files of products (name, description,
//! price), validates every row on its own and stores the valid ones, refusing
//! duplicate names. The caller gets a per-row outcome instead of an
//! all-or-nothing answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐
//! │ CSV bytes│──▶│  Parser  │──▶│ Columns  │──▶│ Rows:     │──▶│ Gateway  │
//! │          │   │          │   │ contract │   │ normalize │   │ (dedup + │
//! │          │   │          │   │          │   │ +validate │   │  store)  │
//! └──────────┘   └──────────┘   └──────────┘   └───────────┘   └──────────┘
//! ```
//!
//! Imports run either inline (HTTP upload or CLI, result returned) or from a
//! queue (result only logged).
//!
//! ## Modules
//!
//! - [`error`] - Layered error types
//! - [`models`] - Rows, records, violations and batch results
//! - [`parser`] - Delimited-text decoding and parsing
//! - [`validation`] - Column contract and record rules
//! - [`ingest`] - Batch importer and queued jobs
//! - [`store`] - Storage adapters and the persistence gateway
//! - [`api`] - HTTP API server
//! - [`config`] - Environment configuration
//! - [`logging`] - Tracing setup

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Ingestion
pub mod ingest;

// Storage
pub mod store;

// HTTP API
pub mod api;

// Runtime
pub mod config;
pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, GatewayError, ImportError, QueueError, StoreError, UploadError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    BatchItemError, BatchResult, CandidateRecord, PersistOutcome, RawRow, Rule, StoredProduct,
    Violation,
};

// =============================================================================
// Re-exports - Parsing & Validation
// =============================================================================

pub use parser::{decode_content, parse_buffer, parse_file, Separator};

pub use validation::{validate_columns, validate_record, REQUIRED_COLUMNS};

// =============================================================================
// Re-exports - Ingestion
// =============================================================================

pub use ingest::{
    handle_job, spawn_workers, to_candidate, BatchImporter, ImportJob, ImportOptions, JobQueue,
};

// =============================================================================
// Re-exports - Storage
// =============================================================================

pub use store::{MemoryStore, PersistBatch, PgStore, ProductGateway, ProductStore};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::{ImportLog, LogEntry, LogLevel, UploadResponse};

pub use config::Config;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
