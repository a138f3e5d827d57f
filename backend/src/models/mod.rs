//! Domain models for the Prodload ingestion pipeline.
//!
//! - [`RawRow`] - one parsed line, column name to raw string
//! - [`CandidateRecord`] - a normalized but not yet validated product
//! - [`Violation`] / [`Rule`] - one failed field constraint
//! - [`BatchItemError`] - terminal failure of one row
//! - [`BatchResult`] - merged outcome of a whole batch
//! - [`StoredProduct`] - the persisted entity
//! - [`PersistOutcome`] - what the persistence step reports back

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Raw Row
// =============================================================================

/// One parsed data line, in header order.
///
/// Column names are whatever the header produced (trimmed, otherwise as-is).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Column names in header order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    /// Value of `column`, matched ignoring case and surrounding whitespace.
    pub fn get(&self, column: &str) -> Option<&str> {
        let wanted = column.trim();
        self.cells
            .iter()
            .find(|(c, _)| c.trim().eq_ignore_ascii_case(wanted))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// =============================================================================
// Candidate Record
// =============================================================================

/// A row after normalization. `price` is `NaN` when absent or unparseable.
///
/// Serializes `NaN` as `null`. Two records with `NaN` prices compare equal.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateRecord {
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
        }
    }

    pub fn has_numeric_price(&self) -> bool {
        !self.price.is_nan()
    }
}

impl PartialEq for CandidateRecord {
    fn eq(&self, other: &Self) -> bool {
        let same_price = self.price == other.price || (self.price.is_nan() && other.price.is_nan());
        self.name == other.name && self.description == other.description && same_price
    }
}

// =============================================================================
// Violations
// =============================================================================

/// Field-level rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    Required,
    MaxLength,
    Numeric,
    Positive,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::MaxLength => "maxLength",
            Rule::Numeric => "numeric",
            Rule::Positive => "positive",
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed constraint on one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub rule: Rule,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

// =============================================================================
// Batch Outcomes
// =============================================================================

/// Reason recorded for rows rejected by the record validator.
pub const VALIDATION_FAILED: &str = "validation failed";

/// Terminal failure of one row, from validation or from persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemError {
    pub item: CandidateRecord,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

impl BatchItemError {
    pub fn invalid(item: CandidateRecord, violations: Vec<Violation>) -> Self {
        Self {
            item,
            reason: VALIDATION_FAILED.to_string(),
            violations: Some(violations),
        }
    }

    pub fn rejected(item: CandidateRecord, reason: impl Into<String>) -> Self {
        Self {
            item,
            reason: reason.into(),
            violations: None,
        }
    }

    pub fn is_validation_failure(&self) -> bool {
        self.violations.is_some()
    }
}

/// What the persistence step reports for a batch of valid records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistOutcome {
    pub success_count: usize,
    pub errors: Vec<BatchItemError>,
}

/// Merged result of one batch. `error_count` always equals `errors.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<BatchItemError>,
}

impl BatchResult {
    /// Validation errors first, then persistence errors, each in submission order.
    pub fn merge(validation_errors: Vec<BatchItemError>, persisted: PersistOutcome) -> Self {
        let mut errors = validation_errors;
        errors.extend(persisted.errors);
        Self {
            success_count: persisted.success_count,
            error_count: errors.len(),
            errors,
        }
    }
}

// =============================================================================
// Stored Product
// =============================================================================

/// Largest price a `NUMERIC(10, 2)` column holds.
pub const MAX_STORED_PRICE: f64 = 99_999_999.99;

/// Round to whole cents, halves away from zero. Every store keeps prices in
/// this form.
pub fn round_to_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// A persisted product. `name` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

impl StoredProduct {
    /// Build the stored form of a validated record with a fresh identifier.
    /// The price is rounded to cents.
    pub fn from_candidate(record: &CandidateRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            description: if record.description.is_empty() {
                None
            } else {
                Some(record.description.clone())
            },
            price: round_to_cents(record.price),
            created_at: Utc::now(),
        }
    }
}
