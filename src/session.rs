//! The caller-facing entry points: resolve, load, preview, search.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::catalog::acquire::{Downloader, KaggleDownloader};
use crate::catalog::cache::MetadataCache;
use crate::catalog::client::{ApiClient, HttpApiClient};
use crate::catalog::resolve::Resolver;
use crate::catalog::search::SearchEngine;
use crate::catalog::select::FormatSelector;
use crate::catalog::suggest::Suggester;
use crate::catalog::{Loaded, ResolvedMetadata, SearchResult};
use crate::config::Settings;
use crate::catalog::memory::MemoryProbe;
use crate::error::{KaggleEaseError, NetworkStage};

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TOP: usize = 5;
pub const DEFAULT_SUGGESTIONS: usize = 3;
pub const PREVIEW_ROWS: usize = 5;

/// Upper bound on time spent gathering suggestions for one failed handle.
const SUGGEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle resolution and loading against one catalog.
///
/// Collaborators are injected so tests can swap in stub transports:
///
/// ```no_run
/// use kaggleease::{config::Settings, KaggleEase};
///
/// let settings = Settings::from_env()?;
/// let kaggle = KaggleEase::from_settings(&settings);
/// let loaded = kaggle.load("titanic", Some("train.csv"), kaggleease::DEFAULT_LOAD_TIMEOUT)?;
/// if let Some(frame) = loaded.as_frame() {
///     println!("{} rows", frame.row_count());
/// }
/// # Ok::<(), kaggleease::KaggleEaseError>(())
/// ```
pub struct KaggleEase {
    resolver: Resolver,
    suggester: Suggester,
    selector: FormatSelector,
    search: SearchEngine,
}

impl KaggleEase {
    pub fn new(client: Arc<dyn ApiClient>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&client)),
            suggester: Suggester::new(Arc::clone(&client)),
            selector: FormatSelector::new(downloader),
            search: SearchEngine::new(client),
        }
    }

    /// Shares a metadata cache with other sessions in the process.
    pub fn with_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.resolver = self.resolver.with_cache(cache);
        self
    }

    /// Replaces the free-memory source consulted before tables are loaded.
    pub fn with_memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.selector = self.selector.with_memory_probe(memory);
        self
    }

    /// Wires the HTTP client and downloader described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(HttpApiClient::new(settings)),
            Arc::new(KaggleDownloader::new(settings)),
        )
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        self.resolver.cache()
    }

    /// Resolves a handle; a miss carries near-match suggestions when there are any.
    ///
    /// `timeout` covers resolution and suggestion together.
    pub fn resolve(
        &self,
        handle: &str,
        timeout: Duration,
    ) -> Result<ResolvedMetadata, KaggleEaseError> {
        self.resolve_until(handle, Instant::now() + timeout)
    }

    fn resolve_until(
        &self,
        handle: &str,
        deadline: Instant,
    ) -> Result<ResolvedMetadata, KaggleEaseError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.resolver
            .resolve(handle, remaining)
            .map_err(|err| self.with_suggestions(handle, err, deadline))
    }

    fn with_suggestions(
        &self,
        handle: &str,
        err: KaggleEaseError,
        deadline: Instant,
    ) -> KaggleEaseError {
        if !matches!(err, KaggleEaseError::DatasetNotFound(_)) {
            return err;
        }
        let budget = deadline
            .saturating_duration_since(Instant::now())
            .min(SUGGEST_TIMEOUT);
        let suggestions = self.suggester.suggest(handle, DEFAULT_SUGGESTIONS, budget);
        if suggestions.is_empty() {
            return err;
        }
        debug!(handle, ?suggestions, "attaching suggestions");
        let did_you_mean = format!("Did you mean: {}?", suggestions.join(", "));
        let fix = match err.fix_suggestion() {
            Some(existing) => format!("{existing}. {did_you_mean}"),
            None => did_you_mean,
        };
        err.with_fix_suggestion(fix)
    }

    /// Resolves, downloads and parses (or returns the path of) a resource.
    ///
    /// `timeout` is one budget for the whole call; the download gets what
    /// resolution left over.
    pub fn load(
        &self,
        handle: &str,
        file: Option<&str>,
        timeout: Duration,
    ) -> Result<Loaded, KaggleEaseError> {
        let deadline = Instant::now() + timeout;
        let metadata = self.resolve_until(handle, deadline)?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(KaggleEaseError::network(
                NetworkStage::Download,
                format!(
                    "the {}s budget was spent resolving '{}' before the download could start",
                    timeout.as_secs_f64(),
                    metadata.canonical_handle
                ),
            ));
        }
        self.selector.materialize(&metadata, file, remaining)
    }

    /// Like [`load`](Self::load) but keeps only the first `rows` rows.
    pub fn preview(
        &self,
        handle: &str,
        file: Option<&str>,
        timeout: Duration,
        rows: usize,
    ) -> Result<Loaded, KaggleEaseError> {
        Ok(match self.load(handle, file, timeout)? {
            Loaded::Frame(frame) => Loaded::Frame(frame.head(rows)),
            path @ Loaded::Path(_) => path,
        })
    }

    pub fn search(
        &self,
        query: &str,
        top: usize,
        timeout: Duration,
    ) -> Result<Vec<SearchResult>, KaggleEaseError> {
        self.search.search(query, top, timeout)
    }
}
