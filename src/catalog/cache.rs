use std::collections::BTreeMap;
use std::sync::RwLock;

use super::ResolvedMetadata;

/// Append-only store of resolved metadata keyed by canonical handle.
///
/// The first value recorded for a key is kept for the life of the cache, so
/// resolving the same handle repeatedly yields equal metadata even when
/// callers race.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<BTreeMap<String, ResolvedMetadata>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `metadata` unless its key is already present; returns the stored value.
    pub fn record(&self, metadata: ResolvedMetadata) -> ResolvedMetadata {
        let key = metadata.canonical_handle.to_ascii_lowercase();
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        match self.entries.write() {
            Ok(mut entries) => entries.entry(key).or_insert(metadata).clone(),
            Err(_) => metadata,
        }
    }

    pub fn get(&self, canonical_handle: &str) -> Option<ResolvedMetadata> {
        let entries = self.entries.read().ok()?;
        entries.get(&canonical_handle.to_ascii_lowercase()).cloned()
    }

    /// First entry (by key order) whose slug contains `slug`, case-insensitively.
    pub fn find_partial(&self, slug: &str) -> Option<ResolvedMetadata> {
        let needle = slug.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return None;
        }
        let entries = self.entries.read().ok()?;
        entries
            .values()
            .find(|metadata| metadata.slug().to_ascii_lowercase().contains(&needle))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
