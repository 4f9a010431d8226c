//! JSON record reader.
//!
//! Accepts a top-level array of records, a single record object, or
//! line-delimited JSON (one value per line). Columns are the union of record
//! keys in first-seen order. Nested values are kept as their JSON text;
//! non-object records land in a single `value` column.

use serde_json::{Map, Value};

use super::TabularFrame;
use crate::error::KaggleEaseError;

const SCALAR_COLUMN: &str = "value";

/// Parses JSON records from a byte slice.
pub fn from_json_slice(bytes: &[u8]) -> Result<TabularFrame, KaggleEaseError> {
    let records = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(items)) => items,
        Ok(single) => vec![single],
        Err(whole_err) => parse_lines(bytes).map_err(|line_err| {
            KaggleEaseError::data_format(format!(
                "not a JSON document ({whole_err}) nor line-delimited JSON ({line_err})"
            ))
        })?,
    };

    Ok(records_to_frame(records))
}

/// Parses JSON records from a string.
pub fn from_json_str(text: &str) -> Result<TabularFrame, KaggleEaseError> {
    from_json_slice(text.as_bytes())
}

fn parse_lines(bytes: &[u8]) -> Result<Vec<Value>, String> {
    let text = std::str::from_utf8(bytes).map_err(|source| source.to_string())?;
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str::<Value>(line)
            .map_err(|source| format!("line {}: {}", idx + 1, source))?;
        records.push(value);
    }
    if records.is_empty() {
        return Err("no records".to_string());
    }
    Ok(records)
}

fn records_to_frame(records: Vec<Value>) -> TabularFrame {
    let mut columns: Vec<String> = Vec::new();
    let mut objects: Vec<Map<String, Value>> = Vec::with_capacity(records.len());

    for record in records {
        let object = match record {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert(SCALAR_COLUMN.to_string(), other);
                map
            }
        };
        for key in object.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }

    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| object.get(column).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    TabularFrame::new(columns, rows)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
