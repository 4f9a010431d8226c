//! In-memory tabular structure and the readers that produce it.
//!
//! - [`io_delimited`]: CSV and TSV
//! - [`io_json`]: JSON array-of-records and line-delimited JSON

pub mod io_delimited;
pub mod io_json;

use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::KaggleEaseError;

/// File formats the loader knows how to classify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
}

impl TableFormat {
    /// Maps a declared type or extension (`"csv"`, `".TSV"`, ...) to a parseable format.
    pub fn from_declared_type(declared: &str) -> Option<Self> {
        match declared.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_declared_type)
    }

    /// Parses raw file bytes into a frame.
    pub fn parse(self, bytes: &[u8]) -> Result<TabularFrame, KaggleEaseError> {
        match self {
            Self::Csv => io_delimited::from_delimited_slice(bytes, b','),
            Self::Tsv => io_delimited::from_delimited_slice(bytes, b'\t'),
            Self::Json | Self::JsonLines => io_json::from_json_slice(bytes),
        }
    }
}

/// Reads and parses a local file.
pub fn read_table(path: &Path, format: TableFormat) -> Result<TabularFrame, KaggleEaseError> {
    let bytes = std::fs::read(path).map_err(|source| {
        KaggleEaseError::data_format(format!("cannot read {}: {}", path.display(), source))
    })?;
    format.parse(&bytes).map_err(|err| match err {
        KaggleEaseError::DataFormat(diagnostic) => KaggleEaseError::data_format(format!(
            "{}: {}",
            path.display(),
            diagnostic.message
        )),
        other => other,
    })
}

/// Row/column data parsed from a dataset file. Cells are kept as text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TabularFrame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TabularFrame {
    /// Builds a frame, padding short rows with empty cells.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        for row in &mut rows {
            if row.len() < columns.len() {
                row.resize(columns.len(), String::new());
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or_default())
                .collect(),
        )
    }

    pub fn head(&self, n: usize) -> TabularFrame {
        TabularFrame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, KaggleEaseError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)
            .map_err(|source| KaggleEaseError::data_format(format!("CSV export failed: {source}")))?;
        String::from_utf8(buffer)
            .map_err(|source| KaggleEaseError::data_format(format!("CSV export failed: {source}")))
    }
}

const MAX_CELL_WIDTH: usize = 24;

impl fmt::Display for TabularFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clip = |cell: &str| -> String {
            if cell.chars().count() > MAX_CELL_WIDTH {
                let mut clipped: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
                clipped.push('…');
                clipped
            } else {
                cell.to_string()
            }
        };

        let header: Vec<String> = self.columns.iter().map(|c| clip(c)).collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| clip(c)).collect())
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for row in &body {
            for (idx, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(idx) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let write_line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let mut first = true;
            for (cell, width) in cells.iter().zip(&widths) {
                if !first {
                    write!(f, "  ")?;
                }
                first = false;
                write!(f, "{:<width$}", cell, width = *width)?;
            }
            writeln!(f)
        };

        write_line(f, &header)?;
        for row in &body {
            write_line(f, row)?;
        }
        Ok(())
    }
}
