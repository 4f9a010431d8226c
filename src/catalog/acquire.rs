use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use super::client::{agent_with_timeout, transport_error, HttpApiClient, USER_AGENT};
use super::ResourceKind;
use crate::config::Settings;
use crate::error::{KaggleEaseError, NetworkStage};

/// Written once a download has been fully unpacked.
pub const COMPLETE_MARKER: &str = ".kaggleease-complete";

/// Extension of a fetched payload that was not an archive and is kept as-is.
pub const PAYLOAD_EXTENSION: &str = "download";

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Fetches a resolved resource to local disk.
pub trait Downloader: Send + Sync {
    /// Returns the local directory (or file) holding the resource's content.
    ///
    /// # Errors
    /// `Network` (stage download) for timeouts and transport failures,
    /// `Auth` when refused, `DatasetNotFound` when the catalog has no archive.
    fn download(
        &self,
        kind: ResourceKind,
        canonical_handle: &str,
        timeout: Duration,
    ) -> Result<PathBuf, KaggleEaseError>;
}

/// Downloads archives from the Kaggle API into a local cache directory.
#[derive(Clone, Debug)]
pub struct KaggleDownloader {
    client: HttpApiClient,
    cache_dir: PathBuf,
}

impl KaggleDownloader {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: HttpApiClient::new(settings),
            cache_dir: settings.cache_dir.clone(),
        }
    }

    /// Where the unpacked content of a resource lives.
    pub fn target_dir(&self, kind: ResourceKind, canonical_handle: &str) -> PathBuf {
        let bucket = match kind {
            ResourceKind::Competition => "competitions",
            ResourceKind::Dataset => "datasets",
        };
        canonical_handle
            .split('/')
            .fold(self.cache_dir.join(bucket), |dir, part| dir.join(part))
    }

    fn fetch(
        &self,
        kind: ResourceKind,
        canonical_handle: &str,
        dir: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, KaggleEaseError> {
        let url = self.client.url_for(&download_route(kind, canonical_handle));
        let network = |message: String| KaggleEaseError::network(NetworkStage::Download, message);

        let mut response = agent_with_timeout(timeout)
            .get(&url)
            .header("Authorization", self.client.auth_header())
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|source| {
                network(format!(
                    "downloading '{}' failed: {}",
                    canonical_handle,
                    transport_error(source, timeout)
                ))
            })?;

        let status = response.status().as_u16();
        debug!(url = %url, status, "download request");
        match status {
            200..=299 => {}
            401 | 403 => {
                return Err(KaggleEaseError::auth(format!(
                    "download of '{}' was refused (HTTP {})",
                    canonical_handle, status
                ))
                .with_fix_suggestion(match kind {
                    ResourceKind::Competition => {
                        "accept the competition rules on kaggle.com before downloading"
                    }
                    ResourceKind::Dataset => "check that the credentials can access this dataset",
                }))
            }
            404 => {
                return Err(KaggleEaseError::not_found(format!(
                    "no downloadable archive for {} '{}'",
                    kind, canonical_handle
                )))
            }
            other => {
                return Err(network(format!(
                    "downloading '{}' returned HTTP {}",
                    canonical_handle, other
                )))
            }
        }

        let payload_path = dir.join(payload_name(canonical_handle));
        let mut file = File::create(&payload_path).map_err(|source| {
            network(format!("cannot write {}: {}", payload_path.display(), source))
        })?;
        let mut reader = response.body_mut().as_reader();
        io::copy(&mut reader, &mut file).map_err(|source| {
            let reason = if source.kind() == io::ErrorKind::TimedOut {
                format!("timed out after {timeout:?}")
            } else {
                source.to_string()
            };
            network(format!("downloading '{}' failed: {}", canonical_handle, reason))
        })?;
        drop(file);

        Ok(payload_path)
    }
}

impl Downloader for KaggleDownloader {
    fn download(
        &self,
        kind: ResourceKind,
        canonical_handle: &str,
        timeout: Duration,
    ) -> Result<PathBuf, KaggleEaseError> {
        let dir = self.target_dir(kind, canonical_handle);
        if dir.join(COMPLETE_MARKER).is_file() {
            debug!(dir = %dir.display(), "download cache hit");
            return Ok(dir);
        }

        let disk_error = |path: &Path, source: io::Error| {
            KaggleEaseError::network(
                NetworkStage::Download,
                format!("cannot write {}: {}", path.display(), source),
            )
        };

        std::fs::create_dir_all(&dir).map_err(|source| disk_error(&dir, source))?;
        let payload_path = self.fetch(kind, canonical_handle, &dir, timeout)?;

        if is_zip(&payload_path) {
            unpack(&payload_path, &dir)?;
            std::fs::remove_file(&payload_path)
                .map_err(|source| disk_error(&payload_path, source))?;
        }

        let marker = dir.join(COMPLETE_MARKER);
        File::create(&marker).map_err(|source| disk_error(&marker, source))?;
        info!(handle = canonical_handle, %kind, dir = %dir.display(), "download complete");
        Ok(dir)
    }
}

/// API route that serves the whole resource as one archive.
pub fn download_route(kind: ResourceKind, canonical_handle: &str) -> String {
    let encoded: Vec<String> = canonical_handle
        .split('/')
        .map(|part| url::form_urlencoded::byte_serialize(part.as_bytes()).collect())
        .collect();
    match kind {
        ResourceKind::Competition => {
            format!("competitions/data/download-all/{}", encoded.join("/"))
        }
        ResourceKind::Dataset => format!("datasets/download/{}", encoded.join("/")),
    }
}

fn payload_name(canonical_handle: &str) -> String {
    let slug = canonical_handle
        .rsplit('/')
        .next()
        .unwrap_or(canonical_handle);
    format!("{slug}.{PAYLOAD_EXTENSION}")
}

fn is_zip(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut magic))
        .map(|_| magic == ZIP_MAGIC)
        .unwrap_or(false)
}

fn unpack(archive_path: &Path, dir: &Path) -> Result<(), KaggleEaseError> {
    let corrupt = |message: String| KaggleEaseError::network(NetworkStage::Download, message);

    let file = File::open(archive_path)
        .map_err(|source| corrupt(format!("cannot open {}: {}", archive_path.display(), source)))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| {
        corrupt(format!(
            "downloaded archive {} is not readable: {}",
            archive_path.display(),
            source
        ))
    })?;
    archive.extract(dir).map_err(|source| {
        corrupt(format!(
            "failed to unpack {} into {}: {}",
            archive_path.display(),
            dir.display(),
            source
        ))
    })
}
