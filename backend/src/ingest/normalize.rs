//! Raw row to candidate record.

use crate::models::{CandidateRecord, RawRow};

/// Normalize one row. Never fails: missing text becomes an empty string and a
/// missing or unreadable price becomes `NaN`.
pub fn to_candidate(row: &RawRow) -> CandidateRecord {
    CandidateRecord {
        name: text(row, "name"),
        description: text(row, "description"),
        price: row.get("price").map(parse_price).unwrap_or(f64::NAN),
    }
}

fn text(row: &RawRow, column: &str) -> String {
    row.get(column).map(str::trim).unwrap_or_default().to_string()
}

/// Plain decimal with `.` as separator. No currency symbols, no grouping.
pub fn parse_price(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells.iter().copied().collect()
    }

    #[test]
    fn test_trims_and_parses() {
        let c = to_candidate(&row(&[("name", "  Pen "), ("description", " Blue "), ("price", " 10.50 ")]));
        assert_eq!(c, CandidateRecord::new("Pen", "Blue", 10.5));
    }

    #[test]
    fn test_missing_columns_default() {
        let c = to_candidate(&row(&[("sku", "X1")]));
        assert_eq!(c.name, "");
        assert_eq!(c.description, "");
        assert!(c.price.is_nan());
    }

    #[test]
    fn test_unparseable_prices_are_nan() {
        for raw in ["", "   ", "abc", "$10", "1,000.00", "10,5", "inf", "NaN"] {
            assert!(parse_price(raw).is_nan(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_valid_prices() {
        assert_eq!(parse_price("20.00"), 20.0);
        assert_eq!(parse_price("-3"), -3.0);
        assert_eq!(parse_price("0"), 0.0);
        assert_eq!(parse_price(".5"), 0.5);
    }

    #[test]
    fn test_header_case_does_not_matter() {
        let c = to_candidate(&row(&[("Name", "Pen"), ("PRICE", "2")]));
        assert_eq!(c.name, "Pen");
        assert_eq!(c.price, 2.0);
    }
}
