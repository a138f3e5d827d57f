//! Batch orchestration: bytes in, [`BatchResult`] out.
//!
//! 1. Parse the buffer into rows (structural failure aborts)
//! 2. Check the column contract (structural failure aborts)
//! 3. Normalize and validate every row, in order
//! 4. Persist the valid ones through [`PersistBatch`]
//! 5. Merge: validation errors first, then persistence errors
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prodload::{BatchImporter, ImportLog, ImportOptions, MemoryStore, ProductGateway};
//!
//! let log = ImportLog::new();
//! let gateway = ProductGateway::new(Arc::new(MemoryStore::new()), log.clone());
//! let importer = BatchImporter::new(Arc::new(gateway), log);
//!
//! let result = importer
//!     .process_batch(b"name,price\nPen,10.50\n", &ImportOptions::default())
//!     .await?;
//! assert_eq!(result.success_count, 1);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::normalize::to_candidate;
use crate::api::logs::ImportLog;
use crate::error::ImportResult;
use crate::models::{BatchItemError, BatchResult, CandidateRecord, RawRow};
use crate::parser::{parse_buffer, Separator};
use crate::store::PersistBatch;
use crate::validation::{validate_columns, validate_record, REQUIRED_COLUMNS};

/// Options for one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportOptions {
    pub separator: Separator,
}

impl ImportOptions {
    pub fn with_separator(separator: Separator) -> Self {
        Self { separator }
    }
}

/// Rows split by the record validator.
#[derive(Debug, Default)]
struct ValidatedRows {
    valid: Vec<CandidateRecord>,
    errors: Vec<BatchItemError>,
}

#[derive(Clone)]
pub struct BatchImporter {
    persister: Arc<dyn PersistBatch>,
    log: ImportLog,
}

impl BatchImporter {
    pub fn new(persister: Arc<dyn PersistBatch>, log: ImportLog) -> Self {
        Self { persister, log }
    }

    pub fn log(&self) -> &ImportLog {
        &self.log
    }

    /// Import one buffer.
    ///
    /// Returns an error only for whole-batch problems (undecodable or
    /// malformed text, no rows, missing columns). Everything that goes wrong
    /// with an individual row ends up in the result's `errors`.
    pub async fn process_batch(&self, buffer: &[u8], options: &ImportOptions) -> ImportResult<BatchResult> {
        self.log.info(format!(
            "Reading CSV ({} bytes, separator '{}')",
            buffer.len(),
            options.separator
        ));
        let rows = parse_buffer(buffer, options.separator)?;
        self.import_rows(&rows).await
    }

    /// Steps 2 to 5 on rows that are already parsed.
    pub async fn import_rows(&self, rows: &[RawRow]) -> ImportResult<BatchResult> {
        validate_columns(rows, &REQUIRED_COLUMNS)?;
        self.log.success(format!("Read {} rows", rows.len()));

        let validated = self.validate_rows(rows);
        if !validated.errors.is_empty() {
            self.log.warning(format!("{} rows failed validation", validated.errors.len()));
        }

        let persisted = self.persister.create_batch(validated.valid).await;
        let result = BatchResult::merge(validated.errors, persisted);

        self.log.success(format!(
            "Import finished: {} stored, {} rejected",
            result.success_count, result.error_count
        ));
        Ok(result)
    }

    fn validate_rows(&self, rows: &[RawRow]) -> ValidatedRows {
        let mut out = ValidatedRows::default();

        for (index, row) in rows.iter().enumerate() {
            let candidate = to_candidate(row);
            let violations = validate_record(&candidate);

            if violations.is_empty() {
                out.valid.push(candidate);
            } else {
                tracing::debug!(
                    line = index + 2,
                    violations = ?violations.iter().map(|v| (&v.field, v.rule)).collect::<Vec<_>>(),
                    "Invalid row"
                );
                out.errors.push(BatchItemError::invalid(candidate, violations));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use crate::models::{PersistOutcome, Rule, StoredProduct};
    use crate::store::{MemoryStore, ProductGateway};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn importer_with(store: MemoryStore) -> BatchImporter {
        let log = ImportLog::new();
        let gateway = ProductGateway::new(Arc::new(store), log.clone());
        BatchImporter::new(Arc::new(gateway), log)
    }

    fn importer() -> BatchImporter {
        importer_with(MemoryStore::new())
    }

    async fn run(importer: &BatchImporter, csv: &str) -> ImportResult<BatchResult> {
        importer.process_batch(csv.as_bytes(), &ImportOptions::default()).await
    }

    /// Records what it was asked to persist and accepts everything.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CandidateRecord>>,
    }

    #[async_trait]
    impl PersistBatch for Recorder {
        async fn create_batch(&self, records: Vec<CandidateRecord>) -> PersistOutcome {
            let count = records.len();
            self.seen.lock().unwrap().extend(records);
            PersistOutcome { success_count: count, errors: Vec::new() }
        }
    }

    #[tokio::test]
    async fn test_all_rows_valid() {
        let result = run(&importer(), "name,price\nPen,10.50\nBook,20.00\n").await.unwrap();
        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_row_reported_with_all_violations() {
        let result = run(&importer(), "name,price\n,abc\nEraser,1.50\n").await.unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 1);

        let err = &result.errors[0];
        assert_eq!(err.reason, "validation failed");
        let rules: Vec<Rule> = err.violations.as_ref().unwrap().iter().map(|v| v.rule).collect();
        assert!(rules.contains(&Rule::Required));
        assert!(rules.contains(&Rule::Numeric));
        assert!(!rules.contains(&Rule::Positive));
    }

    #[tokio::test]
    async fn test_existing_name_is_duplicate() {
        let existing = StoredProduct::from_candidate(&CandidateRecord::new("Existing", "", 8.0));
        let importer = importer_with(MemoryStore::with_products([existing]));

        let result = run(&importer, "name,price\nExisting,8.00\n").await.unwrap();
        assert_eq!(result.success_count, 0);
        assert_eq!(result.error_count, 1);
        assert!(result.errors[0].reason.contains("already exists"));
        assert!(result.errors[0].violations.is_none());
    }

    #[tokio::test]
    async fn test_header_only_is_empty_table() {
        let err = run(&importer(), "name,price\n").await.unwrap_err();
        assert!(matches!(err, ImportError::EmptyTable));
    }

    #[tokio::test]
    async fn test_missing_price_column() {
        let err = run(&importer(), "name,description\nPen,Blue\n").await.unwrap_err();
        match err {
            ImportError::MissingColumns { missing, .. } => assert_eq!(missing, vec!["price"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_columns_persist_nothing() {
        let recorder = Arc::new(Recorder::default());
        let importer = BatchImporter::new(recorder.clone(), ImportLog::new());

        assert!(run(&importer, "title,cost\nPen,1\n").await.is_err());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_bytes_abort() {
        let bytes: &[u8] = &[b'n', b'a', b'm', b'e', b',', b'p', b'\n', 0xFF, 0xFE, 0xFD];
        let err = importer().process_batch(bytes, &ImportOptions::default()).await.unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[tokio::test]
    async fn test_error_ordering() {
        let csv = "name,price\nA,1\n,x\nA,2\nB,-1\nC,3\n";
        let result = run(&importer(), csv).await.unwrap();

        // Validation errors (rows 2 and 4) first, then the duplicate "A".
        let reasons: Vec<(&str, bool)> = result
            .errors
            .iter()
            .map(|e| (e.item.name.as_str(), e.is_validation_failure()))
            .collect();
        assert_eq!(reasons, vec![("", true), ("B", true), ("A", false)]);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, result.errors.len());
    }

    #[tokio::test]
    async fn test_valid_records_submitted_in_row_order() {
        let recorder = Arc::new(Recorder::default());
        let importer = BatchImporter::new(recorder.clone(), ImportLog::new());

        run(&importer, "name,price\nC,1\nbad,0\nA,2\nB,3\n").await.unwrap();
        let names: Vec<String> = recorder.seen.lock().unwrap().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_resubmission_is_duplicate() {
        let importer = importer();
        let first = run(&importer, "name,description,price\nLamp,Desk lamp,30\n").await.unwrap();
        assert_eq!(first.success_count, 1);

        let second = run(&importer, "name,description,price\nLamp,Desk lamp,30\n").await.unwrap();
        assert_eq!(second.success_count, 0);
        assert_eq!(second.error_count, 1);
        assert!(second.errors[0].reason.contains("Lamp"));
    }

    #[tokio::test]
    async fn test_custom_separator() {
        let options = ImportOptions::with_separator(";".parse().unwrap());
        let result = importer()
            .process_batch(b"Name;Price\nPen;1.5\n", &options)
            .await
            .unwrap();
        assert_eq!(result.success_count, 1);
    }
}
