//! Delimited-text (CSV / TSV) reader.
//!
//! The first record is the header. Every later record becomes a row; a record
//! with more fields than the header is rejected so that misaligned files fail
//! loudly instead of shifting columns.

use std::io::Read;

use super::TabularFrame;
use crate::error::KaggleEaseError;

/// Parses delimited text from a byte slice.
///
/// Useful for testing without file I/O.
pub fn from_delimited_slice(bytes: &[u8], delimiter: u8) -> Result<TabularFrame, KaggleEaseError> {
    from_delimited_reader(bytes, delimiter)
}

/// Parses delimited text from a string.
pub fn from_delimited_str(text: &str, delimiter: u8) -> Result<TabularFrame, KaggleEaseError> {
    from_delimited_slice(text.as_bytes(), delimiter)
}

fn from_delimited_reader<R: Read>(reader: R, delimiter: u8) -> Result<TabularFrame, KaggleEaseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()
        .map_err(|source| KaggleEaseError::data_format(format!("invalid header: {source}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err(KaggleEaseError::data_format("file has no header row"));
    }

    let mut rows = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|source| {
            KaggleEaseError::data_format(format!("invalid record {}: {}", idx + 1, source))
        })?;
        if record.len() > columns.len() {
            return Err(KaggleEaseError::data_format(format!(
                "record {} has {} fields but the header has {}",
                idx + 1,
                record.len(),
                columns.len()
            )));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(TabularFrame::new(columns, rows))
}
