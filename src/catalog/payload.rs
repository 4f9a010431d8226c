//! Shape-tolerant readers for catalog JSON.
//!
//! The catalog has returned file listings as a bare array and under several
//! keys, with sizes as numbers, numeric strings, or strings like `"45KB"`.
//! Everything here is best-effort and never fails; absence is `None`.

use serde_json::Value;

use super::{FileEntry, SearchResult};
use crate::table::TableFormat;

const FILE_LIST_KEYS: [&str; 3] = ["files", "datasetFiles", "competitionFiles"];
const FILE_NAME_KEYS: [&str; 3] = ["name", "nameNullable", "ref"];
const FILE_SIZE_KEYS: [&str; 4] = ["totalBytes", "totalBytesNullable", "size", "contentLength"];
const FILE_TYPE_KEYS: [&str; 3] = ["fileType", "type", "mimeType"];
const TOTAL_SIZE_KEYS: [&str; 3] = ["totalBytes", "totalSize", "size"];
const SEARCH_LIST_KEYS: [&str; 3] = ["datasets", "competitions", "results"];

/// A file listing read from one probe response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    /// `None` when the body has no recognizable file list at all.
    pub files: Option<Vec<FileEntry>>,
    pub total_size: Option<u64>,
}

impl Listing {
    /// Neither a usable file list nor a size: a 200 that tells us nothing.
    pub fn is_degenerate(&self) -> bool {
        self.files.as_ref().map_or(true, Vec::is_empty) && self.total_size.unwrap_or(0) == 0
    }

    /// Reports a size but lists no files.
    pub fn is_inconsistent(&self) -> bool {
        self.files.as_ref().map_or(true, Vec::is_empty) && self.total_size.unwrap_or(0) > 0
    }
}

/// Reads a file listing from a listing-endpoint body.
pub fn parse_listing(body: &Value) -> Listing {
    let items = match body {
        Value::Array(items) => Some(items),
        Value::Object(_) => FILE_LIST_KEYS
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_array)),
        _ => None,
    };

    let files = items.map(|items| items.iter().filter_map(parse_file_entry).collect());
    let total_size = match body {
        Value::Object(_) => first_size(body, &TOTAL_SIZE_KEYS),
        _ => None,
    };

    Listing { files, total_size }
}

/// Fuzz-only entrypoint for raw listing and search bodies.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_listing(bytes: &[u8]) {
    if let Ok(body) = serde_json::from_slice::<Value>(bytes) {
        let listing = parse_listing(&body);
        assert!(!(listing.is_degenerate() && listing.is_inconsistent()));
        let _ = parse_search_results(&body);
    }
}

fn parse_file_entry(item: &Value) -> Option<FileEntry> {
    let name = first_str(item, &FILE_NAME_KEYS)?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    let size_bytes = first_size(item, &FILE_SIZE_KEYS).unwrap_or(0);
    let declared_type = declared_type(item, &name);
    Some(FileEntry {
        name,
        size_bytes,
        declared_type,
    })
}

/// The payload's own type field when it names a known format, else the extension.
fn declared_type(item: &Value, name: &str) -> String {
    let from_field = first_str(item, &FILE_TYPE_KEYS)
        .map(|t| t.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|t| TableFormat::from_declared_type(t).is_some());

    from_field.unwrap_or_else(|| extension_of(name))
}

/// Lowercase extension of a file name; empty when there is none.
pub fn extension_of(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Reads search hits from a search-endpoint body, skipping entries without a handle.
pub fn parse_search_results(body: &Value) -> Option<Vec<SearchResult>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(_) => SEARCH_LIST_KEYS
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_array))?,
        _ => return None,
    };

    Some(items.iter().filter_map(parse_search_result).collect())
}

fn parse_search_result(item: &Value) -> Option<SearchResult> {
    let handle = first_str(item, &["ref", "handle", "slug"]).map(normalize_ref)?;
    if handle.is_empty() {
        return None;
    }
    let title = first_str(item, &["title", "name"])
        .unwrap_or(handle.as_str())
        .to_string();
    Some(SearchResult {
        size: first_size(item, &["totalBytes", "size"]).unwrap_or(0),
        votes: first_size(item, &["voteCount", "votes", "totalVotes"]).unwrap_or(0),
        handle,
        title,
    })
}

/// Competition refs come back as full URLs; keep the slug.
fn normalize_ref(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    for marker in ["/competitions/", "/c/", "/datasets/"] {
        if let Some((_, tail)) = trimmed.split_once(marker) {
            return tail.to_string();
        }
    }
    trimmed.to_string()
}

fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
}

fn first_size(item: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| item.get(*key).and_then(size_value))
}

fn size_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => parse_size(s),
        _ => None,
    }
}

/// Parses `"1234"`, `"45KB"`, `"1.5 MB"`, ... into bytes (binary multiples).
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "K" | "KIB" => 1 << 10,
        "MB" | "M" | "MIB" => 1 << 20,
        "GB" | "G" | "GIB" => 1 << 30,
        "TB" | "T" | "TIB" => 1 << 40,
        _ => return None,
    };
    Some((number * multiplier as f64).round() as u64)
}
