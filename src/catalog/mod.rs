//! Kaggle catalog orchestration.
//!
//! This module owns remote-specific concerns (handle resolution, suggestion,
//! search, and acquisition). Pure file parsing stays in `crate::table`.

pub mod acquire;
pub mod cache;
pub mod client;
pub mod handle;
pub mod memory;
pub mod payload;
pub mod resolve;
pub mod search;
pub mod select;
pub mod suggest;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::table::{TableFormat, TabularFrame};

/// The two kinds of downloadable resource in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Competition,
    Dataset,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Competition => write!(f, "competition"),
            Self::Dataset => write!(f, "dataset"),
        }
    }
}

/// One downloadable file as described by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size_bytes: u64,
    pub declared_type: String,
}

impl FileEntry {
    pub fn format(&self) -> Option<TableFormat> {
        TableFormat::from_declared_type(&self.declared_type)
    }

    pub fn is_tabular(&self) -> bool {
        self.format().is_some()
    }

    /// File name without any directory prefix.
    pub fn base_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Result of resolving a handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedMetadata {
    pub resource_kind: ResourceKind,
    /// `owner/slug` for datasets, the bare slug for competitions.
    pub canonical_handle: String,
    pub files: Vec<FileEntry>,
    pub total_size_bytes: u64,
}

impl ResolvedMetadata {
    /// The slug part of the canonical handle.
    pub fn slug(&self) -> &str {
        self.canonical_handle
            .rsplit('/')
            .next()
            .unwrap_or(&self.canonical_handle)
    }
}

/// One search hit, in catalog relevance order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub handle: String,
    pub title: String,
    /// Size in bytes.
    pub size: u64,
    pub votes: u64,
}

/// What `load` / `preview` hand back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Loaded {
    Frame(TabularFrame),
    Path(PathBuf),
}

impl Loaded {
    pub fn as_frame(&self) -> Option<&TabularFrame> {
        match self {
            Self::Frame(frame) => Some(frame),
            Self::Path(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Frame(_) => None,
            Self::Path(path) => Some(path),
        }
    }
}

/// Renders a byte count as `512 B`, `1.5 KB`, `3.2 MB`, ...
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
