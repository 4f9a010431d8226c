//! Near-match suggestions for handles that failed to resolve.
//!
//! The catalog's own search is the index: the failed slug (and, when that
//! finds nothing, a prefix of it) is searched across datasets and
//! competitions, and every hit is scored against the failed handle.
//! Suggestion never fails; an unreachable index means no suggestions.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::client::ApiClient;
use super::handle::parse_handle;
use super::payload::parse_search_results;
use super::SearchResult;

/// Candidates scoring above this are not near-matches.
pub const MAX_DISTANCE: f64 = 0.4;

/// Shortest string for which containment counts as a match.
const MIN_CONTAINMENT_LEN: usize = 3;

const SEARCH_ROUTES: [&str; 2] = ["datasets/list", "competitions/list"];

/// Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Edit distance scaled to `0.0..=1.0` by the longer string's length.
pub fn normalized_distance(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(a, b) as f64 / longest as f64
}

fn containment_or_distance(query: &str, candidate: &str) -> f64 {
    let (shorter, longer) = if query.len() <= candidate.len() {
        (query, candidate)
    } else {
        (candidate, query)
    };
    if shorter.chars().count() >= MIN_CONTAINMENT_LEN && longer.contains(shorter) {
        return 0.0;
    }
    normalized_distance(query, candidate)
}

fn normalize_words(text: &str) -> String {
    text.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Scores one catalog entry against the failed handle's tokens; lower is closer.
pub fn score(tokens: &[String], full: &str, entry: &SearchResult) -> f64 {
    let handle = entry.handle.to_ascii_lowercase();
    let entry_slug = handle.rsplit('/').next().unwrap_or(&handle).to_string();
    let title = normalize_words(&entry.title);

    let mut best = normalized_distance(&full.to_ascii_lowercase(), &handle);
    if let Some(slug) = tokens.first() {
        best = best
            .min(containment_or_distance(slug, &entry_slug))
            .min(containment_or_distance(slug, &title));
    }
    best
}

/// Orders scored entries: closest first, then most votes, then handle.
pub fn rank(mut scored: Vec<(f64, SearchResult)>, top: usize) -> Vec<String> {
    scored.retain(|(distance, _)| *distance <= MAX_DISTANCE);
    scored.sort_by(|(da, a), (db, b)| {
        da.partial_cmp(db)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.votes.cmp(&a.votes))
            .then_with(|| a.handle.cmp(&b.handle))
    });
    scored
        .into_iter()
        .take(top)
        .map(|(_, entry)| entry.handle)
        .collect()
}

/// Proposes corrected handles using the catalog search as an index.
pub struct Suggester {
    client: Arc<dyn ApiClient>,
}

impl Suggester {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self { client }
    }

    /// Up to `top` handles close to `failed_handle`. Never fails.
    ///
    /// `timeout` bounds all index requests together; lookups left without
    /// time are skipped.
    pub fn suggest(&self, failed_handle: &str, top: usize, timeout: Duration) -> Vec<String> {
        if top == 0 || timeout.is_zero() {
            return Vec::new();
        }

        let (tokens, full) = match parse_handle(failed_handle) {
            Ok(handle) => (handle.tokens(), handle.as_str().to_string()),
            Err(_) => {
                let cleaned = normalize_words(failed_handle);
                (vec![cleaned.clone()], cleaned)
            }
        };
        let Some(slug) = tokens.first().filter(|slug| !slug.is_empty()) else {
            return Vec::new();
        };

        let deadline = Instant::now() + timeout;
        let mut candidates = self.lookup(&slug.replace(['-', '_'], " "), deadline);
        if candidates.is_empty() {
            let prefix_len = (slug.chars().count() / 2).max(MIN_CONTAINMENT_LEN);
            let prefix: String = slug.chars().take(prefix_len).collect();
            if prefix.len() < slug.len() {
                candidates = self.lookup(&prefix, deadline);
            }
        }

        let scored = candidates
            .into_values()
            .map(|entry| (score(&tokens, &full, &entry), entry))
            .collect();
        let suggestions = rank(scored, top);
        debug!(handle = failed_handle, ?suggestions, "fuzzy suggestions");
        suggestions
    }

    /// Search hits for `query` across the index, deduplicated by handle.
    fn lookup(&self, query: &str, deadline: Instant) -> BTreeMap<String, SearchResult> {
        let mut found = BTreeMap::new();
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();

        for route in SEARCH_ROUTES {
            let path = format!("{route}?search={encoded}");
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(url = %path, "suggestion budget spent");
                break;
            }
            let response = match self.client.get(&path, remaining) {
                Ok(response) if response.status == 200 => response,
                Ok(response) => {
                    debug!(url = %response.url, status = response.status, "suggestion index unavailable");
                    continue;
                }
                Err(source) => {
                    debug!(url = %path, error = %source, "suggestion index unreachable");
                    continue;
                }
            };
            let hits = response
                .json
                .as_ref()
                .and_then(parse_search_results)
                .unwrap_or_default();
            for hit in hits {
                found.entry(hit.handle.clone()).or_insert(hit);
            }
        }
        found
    }
}
