//! Validation for product imports.
//!
//! Two layers, applied in order:
//!
//! ## Column contract (whole table)
//! [`validate_columns`] checks the header once, before any row is touched.
//! A failure here is structural and aborts the batch.
//!
//! ## Record rules (per row)
//! [`validate_record`] runs every field rule and returns all violations. An
//! empty list means the record may be persisted.
//!
//! | Field         | Rules                                    |
//! |---------------|------------------------------------------|
//! | `name`        | `required`, `maxLength` (100 characters) |
//! | `description` | none                                     |
//! | `price`       | `numeric`, `positive`                    |
//!
//! # Example
//!
//! ```rust,ignore
//! use prodload::models::CandidateRecord;
//! use prodload::validation::validate_record;
//!
//! let violations = validate_record(&CandidateRecord::new("", "", f64::NAN));
//! assert_eq!(violations.len(), 2);
//! ```

use crate::error::{ImportError, ImportResult};
use crate::models::{CandidateRecord, RawRow, Rule, Violation};

/// Columns every import must provide.
pub const REQUIRED_COLUMNS: [&str; 2] = ["name", "price"];

/// Longest accepted product name, in characters.
pub const NAME_MAX_LENGTH: usize = 100;

/// Check that the table has rows and that its header carries every required
/// column. Header names are compared lower-cased and trimmed; unknown
/// columns are ignored.
pub fn validate_columns(rows: &[RawRow], required: &[&str]) -> ImportResult<()> {
    let first = rows.first().ok_or(ImportError::EmptyTable)?;

    let available: Vec<String> = first
        .columns()
        .map(|c| c.trim().to_lowercase())
        .collect();

    let missing: Vec<String> = required
        .iter()
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !available.contains(r))
        .collect();

    if !missing.is_empty() {
        tracing::warn!(?missing, ?available, "Required columns not found");
        return Err(ImportError::MissingColumns {
            missing,
            required: required.iter().map(|r| r.to_string()).collect(),
        });
    }

    tracing::debug!(?available, "Column contract satisfied");
    Ok(())
}

/// Apply every field rule to `record`.
///
/// `positive` is only checked when the price is numeric, so a missing or
/// unparseable price reports `numeric` alone.
pub fn validate_record(record: &CandidateRecord) -> Vec<Violation> {
    let mut violations = Vec::new();

    if record.name.trim().is_empty() {
        violations.push(Violation::new("name", Rule::Required, "Product name is required"));
    }
    if record.name.chars().count() > NAME_MAX_LENGTH {
        violations.push(Violation::new(
            "name",
            Rule::MaxLength,
            format!("Product name must be at most {} characters", NAME_MAX_LENGTH),
        ));
    }

    if !record.has_numeric_price() {
        violations.push(Violation::new("price", Rule::Numeric, "Price must be a number"));
    } else if record.price <= 0.0 {
        violations.push(Violation::new("price", Rule::Positive, "Price must be positive"));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(columns: &[&str]) -> RawRow {
        columns.iter().map(|c| (*c, "x")).collect()
    }

    fn rules(record: &CandidateRecord) -> Vec<(String, Rule)> {
        validate_record(record)
            .into_iter()
            .map(|v| (v.field, v.rule))
            .collect()
    }

    #[test]
    fn test_empty_table() {
        let err = validate_columns(&[], &REQUIRED_COLUMNS).unwrap_err();
        assert!(matches!(err, ImportError::EmptyTable));
    }

    #[test]
    fn test_missing_price_column() {
        let err = validate_columns(&[row(&["name", "description"])], &REQUIRED_COLUMNS).unwrap_err();
        match err {
            ImportError::MissingColumns { missing, required } => {
                assert_eq!(missing, vec!["price"]);
                assert_eq!(required, vec!["name", "price"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_columns_case_and_whitespace_insensitive() {
        assert!(validate_columns(&[row(&[" NAME", "Price "])], &REQUIRED_COLUMNS).is_ok());
    }

    #[test]
    fn test_extra_columns_allowed() {
        assert!(validate_columns(&[row(&["sku", "name", "price", "stock"])], &REQUIRED_COLUMNS).is_ok());
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let headers = ["description", "price", "name"];
        let permutations = [
            [0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0],
        ];
        for p in permutations {
            let cols: Vec<&str> = p.iter().map(|i| headers[*i]).collect();
            assert!(validate_columns(&[row(&cols)], &REQUIRED_COLUMNS).is_ok());

            let without_price: Vec<&str> = cols.into_iter().filter(|c| *c != "price").collect();
            assert!(validate_columns(&[row(&without_price)], &REQUIRED_COLUMNS).is_err());
        }
    }

    #[test]
    fn test_only_first_row_is_inspected() {
        let rows = vec![row(&["name", "price"]), row(&["other"])];
        assert!(validate_columns(&rows, &REQUIRED_COLUMNS).is_ok());
    }

    #[test]
    fn test_valid_record() {
        assert!(rules(&CandidateRecord::new("Pen", "", 10.5)).is_empty());
        assert!(rules(&CandidateRecord::new("Pen", "Blue ink", 0.01)).is_empty());
    }

    #[test]
    fn test_empty_name_and_bad_price_both_reported() {
        let found = rules(&CandidateRecord::new("", "", f64::NAN));
        assert_eq!(
            found,
            vec![("name".to_string(), Rule::Required), ("price".to_string(), Rule::Numeric)]
        );
    }

    #[test]
    fn test_nan_price_never_reports_positive() {
        let found = rules(&CandidateRecord::new("Pen", "", f64::NAN));
        assert_eq!(found, vec![("price".to_string(), Rule::Numeric)]);
    }

    #[test]
    fn test_zero_and_negative_price() {
        for price in [0.0, -1.0, -0.0] {
            let found = rules(&CandidateRecord::new("Pen", "", price));
            assert_eq!(found, vec![("price".to_string(), Rule::Positive)]);
        }
    }

    #[test]
    fn test_name_length_limit() {
        assert!(rules(&CandidateRecord::new("a".repeat(100), "", 1.0)).is_empty());

        let found = rules(&CandidateRecord::new("a".repeat(101), "", 1.0));
        assert_eq!(found, vec![("name".to_string(), Rule::MaxLength)]);

        // Characters, not bytes.
        assert!(rules(&CandidateRecord::new("é".repeat(100), "", 1.0)).is_empty());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let record = CandidateRecord::new("", "", -3.0);
        assert_eq!(validate_record(&record), validate_record(&record));
    }
}
