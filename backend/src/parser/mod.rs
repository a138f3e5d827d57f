//! Delimited-text parser.
//!
//! Turns an uploaded buffer into [`RawRow`]s keyed by the (trimmed) header
//! names. Nothing product-specific happens here.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CsvError, CsvResult};
use crate::models::RawRow;

/// Field separator: one ASCII character, `,` by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Separator(u8);

impl Separator {
    pub const COMMA: Separator = Separator(b',');

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self::COMMA
    }
}

impl FromStr for Separator {
    type Err = CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "\t" is accepted spelled out, since it is awkward to pass literally.
        let s = if s == "\\t" { "\t" } else { s };
        match s.as_bytes() {
            [b] if b.is_ascii() && *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(Separator(*b)),
            _ => Err(CsvError::InvalidSeparator(s.to_string())),
        }
    }
}

impl TryFrom<String> for Separator {
    type Error = CsvError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Separator> for String {
    fn from(sep: Separator) -> Self {
        sep.as_char().to_string()
    }
}

impl std::fmt::Display for Separator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            b'\t' => f.write_str("\\t"),
            b => write!(f, "{}", b as char),
        }
    }
}

/// Decode raw bytes to text.
///
/// A UTF-8 or UTF-16 byte order mark selects that encoding and is dropped;
/// otherwise the bytes must be valid UTF-8.
pub fn decode_content(bytes: &[u8]) -> CsvResult<String> {
    let (encoding, bom_len) =
        encoding_rs::Encoding::for_bom(bytes).unwrap_or((encoding_rs::UTF_8, 0));

    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .map(|text| text.into_owned())
        .ok_or_else(|| CsvError::Decode(format!("input is not valid {}", encoding.name())))
}

/// Parse a buffer with the given separator.
///
/// The first line is the header; header names are trimmed. Blank lines are
/// skipped, short lines simply lack their trailing columns and surplus fields
/// are dropped. A header-only buffer yields no rows.
pub fn parse_buffer(bytes: &[u8], separator: Separator) -> CsvResult<Vec<RawRow>> {
    let content = decode_content(bytes)?;
    parse_str(&content, separator)
}

/// Parse already-decoded text.
pub fn parse_str(content: &str, separator: Separator) -> CsvResult<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator.as_byte())
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "Parsed delimited text");
    Ok(rows)
}

/// Read and parse a file from disk.
pub fn parse_file<P: AsRef<Path>>(path: P, separator: Separator) -> CsvResult<Vec<RawRow>> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_buffer(&bytes, separator)
}
