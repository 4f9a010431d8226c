//! Remote API client seam.
//!
//! The core only needs `get(path) -> (status, json, text)`. [`HttpApiClient`]
//! is the `ureq`-backed implementation; tests substitute their own.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Settings;

pub(crate) const USER_AGENT: &str = concat!("kaggleease/", env!("CARGO_PKG_VERSION"));

/// Raw answer from the catalog. Any HTTP status is a response, not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    /// Fully-qualified URL that was requested.
    pub url: String,
    pub status: u16,
    /// Parsed body, `None` when the body is not JSON.
    pub json: Option<Value>,
    pub text: String,
}

impl ApiResponse {
    pub fn new(url: impl Into<String>, status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        let json = serde_json::from_str(&text).ok();
        Self {
            url: url.into(),
            status,
            json,
            text,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

/// Failure below HTTP: nothing usable came back.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Authenticated GET access to the catalog API.
pub trait ApiClient: Send + Sync {
    /// `path` is relative to the API base (`datasets/list?search=x`).
    fn get(&self, path: &str, timeout: Duration) -> Result<ApiResponse, TransportError>;
}

/// `ureq` implementation of [`ApiClient`].
#[derive(Clone, Debug)]
pub struct HttpApiClient {
    base_url: String,
    auth_header: String,
}

impl HttpApiClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            auth_header: settings.credentials.basic_auth_header(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub(crate) fn auth_header(&self) -> &str {
        &self.auth_header
    }
}

impl ApiClient for HttpApiClient {
    fn get(&self, path: &str, timeout: Duration) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(path);
        let agent = agent_with_timeout(timeout);

        let mut response = agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|source| transport_error(source, timeout))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|source| transport_error(source, timeout))?;

        debug!(url = %url, status, bytes = text.len(), "catalog GET");
        Ok(ApiResponse::new(url, status, text))
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// An agent that reports every HTTP status as a response and gives up after `timeout`.
pub(crate) fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}

pub(crate) fn transport_error(source: ureq::Error, timeout: Duration) -> TransportError {
    match source {
        ureq::Error::Timeout(_) => TransportError::Timeout(timeout),
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            TransportError::Timeout(timeout)
        }
        other => TransportError::Connection(other.to_string()),
    }
}
