//! Handle resolution.
//!
//! The catalog's listing endpoints disagree about URL shape depending on
//! resource kind and API version, so resolution walks an ordered list of
//! [`Probe`]s and stops at the first one that returns a usable file listing.
//! Probes never run concurrently: the first success must short-circuit the
//! rest, and the order decides which answer wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::cache::MetadataCache;
use super::client::{ApiClient, TransportError};
use super::handle::{parse_handle, Handle};
use super::payload::parse_listing;
use super::{ResolvedMetadata, ResourceKind};
use crate::error::{KaggleEaseError, NetworkStage};

/// What one endpoint attempt produced.
#[derive(Clone, Debug, PartialEq)]
pub enum ProbeOutcome {
    Resolved(ResolvedMetadata),
    /// The handle's shape does not fit this endpoint; no request was made.
    Skipped,
    /// HTTP 200 without a file list or size.
    Degenerate,
    /// HTTP 200 reporting a size but no files from a dataset endpoint.
    Inconsistent { total_size: u64 },
    AuthRejected { status: u16 },
    Rejected { status: u16 },
    Transport(TransportError),
}

/// One endpoint shape tried during resolution.
pub trait Probe: Send + Sync {
    fn label(&self) -> &str;

    fn probe(&self, client: &dyn ApiClient, handle: &Handle, timeout: Duration) -> ProbeOutcome;
}

/// A listing endpoint described by its resource kind and a route builder.
#[derive(Clone, Copy)]
pub struct ListingProbe {
    label: &'static str,
    kind: ResourceKind,
    route: fn(&Handle) -> Option<String>,
}

impl ListingProbe {
    pub const fn new(
        label: &'static str,
        kind: ResourceKind,
        route: fn(&Handle) -> Option<String>,
    ) -> Self {
        Self { label, kind, route }
    }

    pub fn path(&self, handle: &Handle) -> Option<String> {
        (self.route)(handle)
    }
}

impl std::fmt::Debug for ListingProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingProbe")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Probe for ListingProbe {
    fn label(&self) -> &str {
        self.label
    }

    fn probe(&self, client: &dyn ApiClient, handle: &Handle, timeout: Duration) -> ProbeOutcome {
        let Some(path) = self.path(handle) else {
            debug!(probe = self.label, handle = handle.as_str(), "probe skipped");
            return ProbeOutcome::Skipped;
        };

        let response = match client.get(&path, timeout) {
            Ok(response) => response,
            Err(source) => {
                debug!(probe = self.label, url = %path, error = %source, "catalog probe failed");
                return ProbeOutcome::Transport(source);
            }
        };
        debug!(
            probe = self.label,
            url = %response.url,
            status = response.status,
            "catalog probe"
        );

        if response.is_auth_failure() {
            return ProbeOutcome::AuthRejected {
                status: response.status,
            };
        }
        if response.status != 200 {
            return ProbeOutcome::Rejected {
                status: response.status,
            };
        }
        let Some(body) = response.json.as_ref() else {
            return ProbeOutcome::Degenerate;
        };

        let listing = parse_listing(body);
        if listing.is_inconsistent() {
            // Competition storage can report a size for slugs it cannot list.
            if self.kind == ResourceKind::Competition {
                debug!(probe = self.label, url = %response.url, "sized listing without files, trying next");
                return ProbeOutcome::Degenerate;
            }
            return ProbeOutcome::Inconsistent {
                total_size: listing.total_size.unwrap_or(0),
            };
        }
        if listing.is_degenerate() {
            return ProbeOutcome::Degenerate;
        }

        let files = listing.files.unwrap_or_default();
        let summed: u64 = files.iter().map(|f| f.size_bytes).sum();
        let total_size_bytes = listing.total_size.filter(|size| *size > 0).unwrap_or(summed);

        ProbeOutcome::Resolved(ResolvedMetadata {
            resource_kind: self.kind,
            canonical_handle: canonical_handle(self.kind, handle),
            files,
            total_size_bytes,
        })
    }
}

fn canonical_handle(kind: ResourceKind, handle: &Handle) -> String {
    match kind {
        ResourceKind::Competition => handle.slug().to_string(),
        ResourceKind::Dataset => handle.as_str().to_string(),
    }
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

/// `competitions/storage/list/files/<slug>`, bare handles only.
pub fn competition_storage_path(handle: &Handle) -> Option<String> {
    handle.is_bare().then(|| {
        format!(
            "competitions/storage/list/files/{}",
            encode_segment(handle.slug())
        )
    })
}

/// `datasets/list/files/<owner>/<slug>`, owner/slug handles only.
pub fn dataset_segments_path(handle: &Handle) -> Option<String> {
    let owner = handle.owner()?;
    Some(format!(
        "datasets/list/files/{}/{}",
        encode_segment(owner),
        encode_segment(handle.slug())
    ))
}

/// `datasets/list/files/<handle>` with the whole handle as one segment.
///
/// The `/` is percent-encoded so this stays distinct from the two-segment route.
pub fn dataset_single_segment_path(handle: &Handle) -> Option<String> {
    Some(format!(
        "datasets/list/files/{}",
        encode_segment(handle.as_str())
    ))
}

/// `datasets/list/files?ownerSlug=<owner>&datasetSlug=<slug>`, owner/slug handles only.
pub fn dataset_query_path(handle: &Handle) -> Option<String> {
    let owner = handle.owner()?;
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("ownerSlug", owner)
        .append_pair("datasetSlug", handle.slug())
        .finish();
    Some(format!("datasets/list/files?{query}"))
}

/// Endpoint shapes in priority order.
///
/// The order was established by probing the live API and should be revisited
/// if the catalog changes its conventions.
pub fn default_probes() -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(ListingProbe::new(
            "competition-storage",
            ResourceKind::Competition,
            competition_storage_path,
        )),
        Box::new(ListingProbe::new(
            "dataset-segments",
            ResourceKind::Dataset,
            dataset_segments_path,
        )),
        Box::new(ListingProbe::new(
            "dataset-single-segment",
            ResourceKind::Dataset,
            dataset_single_segment_path,
        )),
        Box::new(ListingProbe::new(
            "dataset-query",
            ResourceKind::Dataset,
            dataset_query_path,
        )),
    ]
}

#[derive(Debug, Default)]
struct ProbeTally {
    auth: usize,
    transport: usize,
    definitive: usize,
    last_auth_status: Option<u16>,
    last_transport: Option<TransportError>,
}

impl ProbeTally {
    fn issued(&self) -> usize {
        self.auth + self.transport + self.definitive
    }

    fn credentials_refused(&self) -> bool {
        self.issued() > 0 && self.auth == self.issued()
    }

    fn into_error(self, handle: &Handle) -> KaggleEaseError {
        if self.credentials_refused() {
            return KaggleEaseError::auth(format!(
                "the catalog rejected the credentials for every lookup of '{}' (HTTP {})",
                handle.as_str(),
                self.last_auth_status.unwrap_or(401)
            ))
            .with_fix_suggestion(
                "check the username and key in kaggle.json or KAGGLE_USERNAME / KAGGLE_KEY",
            );
        }

        if self.definitive == 0 && self.transport > 0 {
            let detail = self
                .last_transport
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no response".to_string());
            return KaggleEaseError::network(
                NetworkStage::Resolution,
                format!("could not reach the catalog while resolving '{}': {}", handle.as_str(), detail),
            );
        }

        KaggleEaseError::not_found(format!(
            "no competition or dataset matches '{}'",
            handle.as_str()
        ))
    }
}

/// Turns handles into [`ResolvedMetadata`].
pub struct Resolver {
    client: Arc<dyn ApiClient>,
    probes: Vec<Box<dyn Probe>>,
    cache: Arc<MetadataCache>,
}

impl Resolver {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            probes: default_probes(),
            cache: Arc::new(MetadataCache::new()),
        }
    }

    pub fn with_probes(mut self, probes: Vec<Box<dyn Probe>>) -> Self {
        self.probes = probes;
        self
    }

    pub fn with_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Resolves `input` within `timeout` (the budget covers all probes).
    ///
    /// # Errors
    /// `DatasetNotFound` when nothing matches, `Auth` when every probe was
    /// refused, `Network` when the catalog could not be reached at all, and
    /// `DataFormat` when a dataset endpoint reports a size but no files.
    /// A partial match from the metadata cache is returned instead of
    /// `DatasetNotFound` or `Network`, never instead of `Auth`.
    pub fn resolve(&self, input: &str, timeout: Duration) -> Result<ResolvedMetadata, KaggleEaseError> {
        let handle = parse_handle(input)?;
        let deadline = Instant::now() + timeout;
        let mut tally = ProbeTally::default();

        for probe in &self.probes {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tally.transport += 1;
                tally.last_transport = Some(TransportError::Timeout(timeout));
                break;
            }

            match probe.probe(self.client.as_ref(), &handle, remaining) {
                ProbeOutcome::Resolved(metadata) => {
                    info!(
                        handle = handle.as_str(),
                        probe = probe.label(),
                        kind = %metadata.resource_kind,
                        canonical = %metadata.canonical_handle,
                        files = metadata.files.len(),
                        "resolved handle"
                    );
                    return Ok(self.cache.record(metadata));
                }
                ProbeOutcome::Inconsistent { total_size } => {
                    warn!(handle = handle.as_str(), probe = probe.label(), total_size, "listing has a size but no files");
                    return Err(KaggleEaseError::data_format(format!(
                        "the catalog reports {} bytes for '{}' but lists no files",
                        total_size,
                        handle.as_str()
                    )));
                }
                ProbeOutcome::Skipped => {}
                ProbeOutcome::AuthRejected { status } => {
                    tally.auth += 1;
                    tally.last_auth_status = Some(status);
                }
                ProbeOutcome::Transport(err) => {
                    tally.transport += 1;
                    tally.last_transport = Some(err);
                }
                ProbeOutcome::Degenerate | ProbeOutcome::Rejected { .. } => {
                    tally.definitive += 1;
                }
            }
        }

        if tally.credentials_refused() {
            return Err(tally.into_error(&handle));
        }
        if let Some(cached) = self.cache.find_partial(handle.slug()) {
            warn!(
                handle = handle.as_str(),
                cached = %cached.canonical_handle,
                "every probe failed, using cached metadata"
            );
            return Ok(cached);
        }

        Err(tally.into_error(&handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(input: &str) -> Handle {
        parse_handle(input).expect("parse")
    }

    #[test]
    fn bare_handles_only_probe_competitions_and_single_segment() {
        let bare = handle("titanic");
        assert_eq!(
            competition_storage_path(&bare).as_deref(),
            Some("competitions/storage/list/files/titanic")
        );
        assert_eq!(dataset_segments_path(&bare), None);
        assert_eq!(
            dataset_single_segment_path(&bare).as_deref(),
            Some("datasets/list/files/titanic")
        );
        assert_eq!(dataset_query_path(&bare), None);
    }

    #[test]
    fn owner_slug_routes() {
        let pair = handle("heptapod/titanic");
        assert_eq!(competition_storage_path(&pair), None);
        assert_eq!(
            dataset_segments_path(&pair).as_deref(),
            Some("datasets/list/files/heptapod/titanic")
        );
        assert_eq!(
            dataset_single_segment_path(&pair).as_deref(),
            Some("datasets/list/files/heptapod%2Ftitanic")
        );
        assert_eq!(
            dataset_query_path(&pair).as_deref(),
            Some("datasets/list/files?ownerSlug=heptapod&datasetSlug=titanic")
        );
    }

    #[test]
    fn canonical_handles() {
        let pair = handle("owner/slug");
        assert_eq!(canonical_handle(ResourceKind::Dataset, &pair), "owner/slug");
        let bare = handle("titanic");
        assert_eq!(canonical_handle(ResourceKind::Competition, &bare), "titanic");
    }

    #[test]
    fn tally_classification() {
        let h = handle("owner/slug");

        let all_auth = ProbeTally {
            auth: 3,
            last_auth_status: Some(403),
            ..ProbeTally::default()
        };
        assert_eq!(all_auth.into_error(&h).kind(), crate::error::ErrorKind::Auth);

        let unreachable = ProbeTally {
            transport: 2,
            auth: 1,
            last_transport: Some(TransportError::Connection("refused".into())),
            ..ProbeTally::default()
        };
        let err = unreachable.into_error(&h);
        assert_eq!(err.network_stage(), Some(NetworkStage::Resolution));

        let mixed = ProbeTally {
            transport: 1,
            definitive: 1,
            ..ProbeTally::default()
        };
        assert_eq!(
            mixed.into_error(&h).kind(),
            crate::error::ErrorKind::DatasetNotFound
        );
    }
}
