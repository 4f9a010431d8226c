use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::client::ApiClient;
use super::payload::parse_search_results;
use super::SearchResult;
use crate::error::{KaggleEaseError, NetworkStage};

/// Free-text dataset search.
pub struct SearchEngine {
    client: Arc<dyn ApiClient>,
}

impl SearchEngine {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self { client }
    }

    /// Searches datasets for `query`, keeping the catalog's order and at most `top` hits.
    ///
    /// Truncation happens here rather than through a page-size parameter, so
    /// the result does not depend on the API's paging defaults. Zero matches
    /// is an empty vector, not an error.
    pub fn search(
        &self,
        query: &str,
        top: usize,
        timeout: Duration,
    ) -> Result<Vec<SearchResult>, KaggleEaseError> {
        if top == 0 {
            return Ok(Vec::new());
        }

        let encoded: String =
            url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        let path = format!("datasets/list?search={encoded}");

        let response = self.client.get(&path, timeout).map_err(|source| {
            KaggleEaseError::network(
                NetworkStage::Search,
                format!("search for '{}' failed: {}", query, source),
            )
        })?;
        debug!(url = %response.url, status = response.status, "catalog search");

        if response.is_auth_failure() {
            return Err(KaggleEaseError::auth(format!(
                "the catalog rejected the credentials (HTTP {})",
                response.status
            )));
        }
        if response.status != 200 {
            return Err(KaggleEaseError::network(
                NetworkStage::Search,
                format!("search for '{}' returned HTTP {}", query, response.status),
            ));
        }

        let mut results = response
            .json
            .as_ref()
            .and_then(parse_search_results)
            .ok_or_else(|| {
                KaggleEaseError::network(
                    NetworkStage::Search,
                    format!("search for '{}' returned an unreadable response", query),
                )
            })?;
        results.truncate(top);
        Ok(results)
    }
}
