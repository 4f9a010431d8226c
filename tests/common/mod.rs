#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use kaggleease::catalog::acquire::Downloader;
use kaggleease::catalog::client::{ApiClient, ApiResponse, TransportError};
use kaggleease::{KaggleEaseError, NetworkStage, ResourceKind};
use serde_json::Value;
use tempfile::TempDir;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Canned reply for one API path.
#[derive(Clone, Debug)]
pub enum Reply {
    Json(u16, Value),
    Status(u16),
    Timeout,
    Refused,
}

/// Catalog stub: exact-path routes, 404 for anything else, and a call log.
#[derive(Debug, Default)]
pub struct MockApi {
    routes: BTreeMap<String, Reply>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, reply: Reply) -> Self {
        self.routes.insert(path.to_string(), reply);
        self
    }

    pub fn json(self, path: &str, body: Value) -> Self {
        self.route(path, Reply::Json(200, body))
    }

    /// Sleeps this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.timed_calls().into_iter().map(|(path, _)| path).collect()
    }

    /// Every call with the timeout the caller passed.
    pub fn timed_calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().expect("call log").clone()
    }

    /// Calls made to listing (resolution) endpoints, in order.
    pub fn probe_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|path| path.contains("/list/files"))
            .collect()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|path| path.contains("list?search="))
            .collect()
    }
}

impl ApiClient for MockApi {
    fn get(&self, path: &str, timeout: Duration) -> Result<ApiResponse, TransportError> {
        self.calls
            .lock()
            .expect("call log")
            .push((path.to_string(), timeout));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let url = format!("mock://api/{path}");
        match self.routes.get(path) {
            Some(Reply::Json(status, body)) => Ok(ApiResponse::new(url, *status, body.to_string())),
            Some(Reply::Status(status)) => Ok(ApiResponse::new(url, *status, "")),
            Some(Reply::Timeout) => Err(TransportError::Timeout(timeout)),
            Some(Reply::Refused) => Err(TransportError::Connection("connection refused".into())),
            None => Ok(ApiResponse::new(url, 404, r#"{"message":"Not found"}"#)),
        }
    }
}

/// Download stub: writes fixture files into a temp directory and returns it.
pub struct MockDownloader {
    dir: TempDir,
    files: Vec<(String, Vec<u8>)>,
    failure: Option<fn() -> KaggleEaseError>,
    calls: Mutex<Vec<(ResourceKind, String)>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            files: Vec::new(),
            failure: None,
            calls: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        }
    }

    pub fn file(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.to_string(), contents.into()));
        self
    }

    pub fn timing_out() -> Self {
        let mut downloader = Self::new();
        downloader.failure = Some(download_timeout as fn() -> KaggleEaseError);
        downloader
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn calls(&self) -> Vec<(ResourceKind, String)> {
        self.calls.lock().expect("call log").clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().expect("timeout log").clone()
    }
}

impl Downloader for MockDownloader {
    fn download(
        &self,
        kind: ResourceKind,
        canonical_handle: &str,
        timeout: Duration,
    ) -> Result<PathBuf, KaggleEaseError> {
        self.timeouts.lock().expect("timeout log").push(timeout);
        self.calls
            .lock()
            .expect("call log")
            .push((kind, canonical_handle.to_string()));
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        for (name, contents) in &self.files {
            let path = self.dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent dir");
            }
            std::fs::write(&path, contents).expect("write fixture");
        }
        Ok(self.dir.path().to_path_buf())
    }
}

fn download_timeout() -> KaggleEaseError {
    KaggleEaseError::network(NetworkStage::Download, "request timed out after 1s")
}

/// `{"files": [{"name": .., "totalBytes": ..}, ..]}`
pub fn listing(files: &[(&str, u64)]) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|(name, size)| serde_json::json!({"name": name, "totalBytes": size}))
        .collect();
    serde_json::json!({ "files": files })
}

/// Search payload in catalog order.
pub fn search_hits(hits: &[(&str, &str, u64)]) -> Value {
    Value::Array(
        hits.iter()
            .map(|(handle, title, votes)| {
                serde_json::json!({
                    "ref": handle,
                    "title": title,
                    "totalBytes": 1024,
                    "voteCount": votes,
                })
            })
            .collect(),
    )
}
