//! Error types for the Prodload ingestion pipeline.
//!
//! Errors are layered the same way the pipeline is:
//!
//! - [`CsvError`] - decoding and delimited-text parsing faults
//! - [`ImportError`] - whole-batch (structural) failures
//! - [`StoreError`] - faults reported by a storage adapter
//! - [`GatewayError`] - per-record persistence outcome, rendered as a row reason
//! - [`UploadError`] - rejections of an uploaded file before import
//! - [`QueueError`] - job transport faults
//! - [`ConfigError`] - bad configuration values
//!
//! Row-level problems are never errors here: they are captured as
//! [`crate::models::BatchItemError`] values inside a [`crate::models::BatchResult`].

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while turning raw bytes into rows.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The separator is not a single ASCII character.
    #[error("Invalid separator '{0}': expected a single ASCII character")]
    InvalidSeparator(String),

    /// Bytes are not valid UTF-8.
    #[error("Undecodable input: {0}")]
    Decode(String),

    /// The delimited text itself is broken.
    #[error("Malformed CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },

    /// Failed to read the source.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::Malformed {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Import (structural) Errors
// =============================================================================

/// Whole-batch failures. Any of these aborts the batch before a single row is
/// counted, so there is never a partial result alongside one.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The buffer could not be parsed.
    #[error("CSV processing failed: {0}")]
    Parse(#[from] CsvError),

    /// No data rows at all.
    #[error("CSV file is empty or has no data rows")]
    EmptyTable,

    /// Required columns are absent from the header.
    #[error("Missing required columns: {}. Expected columns: {}", .missing.join(", "), .required.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        required: Vec<String>,
    },
}

impl ImportError {
    /// Short machine-friendly label, used when logging dropped jobs.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Parse(_) => "parse_failure",
            ImportError::EmptyTable => "empty_table",
            ImportError::MissingColumns { .. } => "missing_columns",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Faults a [`crate::store::ProductStore`] can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A product with this name is already stored.
    #[error("A product named '{0}' already exists")]
    Duplicate(String),

    /// Any other storage failure, already rendered to text.
    #[error("Storage fault: {0}")]
    Storage(String),

    /// Raw database error from the SQL adapter.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of persisting one record, as seen by the batch.
///
/// The `Display` output is the `reason` recorded for the failed row.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("A product named '{0}' already exists")]
    DuplicateName(String),

    #[error("{0}")]
    Storage(String),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(name) => GatewayError::DuplicateName(name),
            StoreError::Storage(detail) => GatewayError::Storage(detail),
            StoreError::Database(e) => GatewayError::Storage(database_detail(&e)),
        }
    }
}

/// Best textual detail for a database error: the server's message when there
/// is one, otherwise the driver's own description.
pub fn database_detail(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Upload Errors
// =============================================================================

/// Rejections of an uploaded file, checked before the importer runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UploadError {
    #[error("No file was sent or the file is empty")]
    EmptyFile,

    #[error("Unsupported file type: {received}. Allowed types: CSV")]
    InvalidFileType { received: String },

    #[error("File too large. Maximum allowed size: {max_bytes} bytes")]
    FileTooLarge { max_bytes: usize },

    #[error("Multipart error: {0}")]
    Multipart(String),
}

// =============================================================================
// Queue Errors
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueueError {
    /// Every consumer has shut down.
    #[error("Import queue is closed")]
    Closed,
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type CsvResult<T> = Result<T, CsvError>;

pub type ImportResult<T> = Result<T, ImportError>;

pub type StoreResult<T> = Result<T, StoreError>;
