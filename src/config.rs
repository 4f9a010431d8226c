//! Credential discovery and runtime settings.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::KaggleEaseError;

pub const DEFAULT_API_BASE: &str = "https://www.kaggle.com/api/v1";

pub const ENV_USERNAME: &str = "KAGGLE_USERNAME";
pub const ENV_KEY: &str = "KAGGLE_KEY";
pub const ENV_CONFIG_DIR: &str = "KAGGLE_CONFIG_DIR";
pub const ENV_API_BASE: &str = "KAGGLEEASE_API_BASE";
pub const ENV_CACHE_DIR: &str = "KAGGLEEASE_CACHE_DIR";

/// Kaggle API username and key.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }

    /// Looks for `kaggle.json` first, then `KAGGLE_USERNAME` / `KAGGLE_KEY`.
    pub fn discover() -> Result<Self, KaggleEaseError> {
        let config_path = default_config_path();
        if let Some(path) = config_path.as_deref() {
            if let Some(credentials) = Self::from_file(path)? {
                return Ok(credentials);
            }
        }

        let username = std::env::var(ENV_USERNAME).ok();
        let key = std::env::var(ENV_KEY).ok();
        Self::from_parts(username, key).ok_or_else(|| {
            let location = config_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "~/.kaggle/kaggle.json".to_string());
            KaggleEaseError::auth("no Kaggle API credentials found").with_fix_suggestion(format!(
                "create {location} with your username and key, or set {ENV_USERNAME} and {ENV_KEY}"
            ))
        })
    }

    /// Builds credentials from optional pieces; both must be non-empty.
    pub fn from_parts(username: Option<String>, key: Option<String>) -> Option<Self> {
        match (username, key) {
            (Some(username), Some(key))
                if !username.trim().is_empty() && !key.trim().is_empty() =>
            {
                Some(Self::new(username.trim(), key.trim()))
            }
            _ => None,
        }
    }

    /// Reads a `kaggle.json` file. A missing file is `Ok(None)`.
    pub fn from_file(path: &Path) -> Result<Option<Self>, KaggleEaseError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(KaggleEaseError::auth(format!(
                    "cannot read {}: {}",
                    path.display(),
                    source
                )))
            }
        };

        let parsed: Credentials = serde_json::from_str(&text).map_err(|source| {
            KaggleEaseError::auth(format!("{} is not valid: {}", path.display(), source))
                .with_fix_suggestion("expected {\"username\": \"...\", \"key\": \"...\"}")
        })?;
        Ok(Self::from_parts(Some(parsed.username), Some(parsed.key)))
    }

    /// Value for an HTTP `Authorization` header.
    pub fn basic_auth_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.key));
        format!("Basic {token}")
    }
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir).join("kaggle.json"));
        }
    }
    home::home_dir().map(|home| home.join(".kaggle").join("kaggle.json"))
}

/// Everything needed to talk to the catalog and store downloads.
#[derive(Clone, Debug)]
pub struct Settings {
    pub api_base: String,
    pub cache_dir: PathBuf,
    pub credentials: Credentials,
}

impl Settings {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            cache_dir: default_cache_dir(),
            credentials,
        }
    }

    /// Settings from the environment with discovered credentials.
    pub fn from_env() -> Result<Self, KaggleEaseError> {
        let mut settings = Self::new(Credentials::discover()?);
        if let Ok(base) = std::env::var(ENV_API_BASE) {
            if !base.trim().is_empty() {
                settings.api_base = base;
            }
        }
        Ok(settings)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }
}

/// `KAGGLEEASE_CACHE_DIR`, else `~/.cache/kaggleease`, else a temp-dir fallback.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    home::home_dir()
        .map(|home| home.join(".cache").join("kaggleease"))
        .unwrap_or_else(|| std::env::temp_dir().join("kaggleease"))
}
