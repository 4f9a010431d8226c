use std::fmt;

use thiserror::Error;

/// Documentation for setting up Kaggle API credentials.
pub const CREDENTIALS_DOCS: &str = "https://github.com/Kaggle/kaggle-api#api-credentials";

/// Human-facing payload carried by every error variant.
///
/// `fix_suggestion` and `docs_link` are optional enrichments; `None` means
/// there is nothing to suggest, never that the lookup was skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub fix_suggestion: Option<String>,
    pub docs_link: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fix_suggestion: None,
            docs_link: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix_suggestion = Some(fix.into());
        self
    }

    pub fn with_docs(mut self, link: impl Into<String>) -> Self {
        self.docs_link = Some(link.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(fix) = &self.fix_suggestion {
            write!(f, "\n  Suggestion: {}", fix)?;
        }
        if let Some(link) = &self.docs_link {
            write!(f, "\n  Docs: {}", link)?;
        }
        Ok(())
    }
}

/// Which phase of a call a network failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkStage {
    Resolution,
    Download,
    Search,
}

impl fmt::Display for NetworkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution => write!(f, "resolution"),
            Self::Download => write!(f, "download"),
            Self::Search => write!(f, "search"),
        }
    }
}

/// Copyable discriminant of [`KaggleEaseError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    DatasetNotFound,
    DataFormat,
    MultipleFiles,
    UnsupportedFormat,
    Network,
}

/// The main error type for kaggleease operations.
#[derive(Debug, Error)]
pub enum KaggleEaseError {
    #[error("Authentication failed: {0}")]
    Auth(Diagnostic),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(Diagnostic),

    #[error("Data format error: {0}")]
    DataFormat(Diagnostic),

    #[error("Multiple candidate files: {diagnostic}")]
    MultipleFiles {
        diagnostic: Diagnostic,
        candidates: Vec<String>,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(Diagnostic),

    #[error("Network error during {stage}: {diagnostic}")]
    Network {
        stage: NetworkStage,
        diagnostic: Diagnostic,
    },
}

impl KaggleEaseError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(Diagnostic::new(message).with_docs(CREDENTIALS_DOCS))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::DatasetNotFound(Diagnostic::new(message))
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat(Diagnostic::new(message))
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(Diagnostic::new(message))
    }

    pub fn multiple_files(candidates: Vec<String>) -> Self {
        let diagnostic = Diagnostic::new(format!(
            "{} tabular files could be loaded: {}",
            candidates.len(),
            candidates.join(", ")
        ))
        .with_fix(format!(
            "pass file=<name> to choose one, e.g. file=\"{}\"",
            candidates.first().map(String::as_str).unwrap_or_default()
        ));
        Self::MultipleFiles {
            diagnostic,
            candidates,
        }
    }

    pub fn network(stage: NetworkStage, message: impl Into<String>) -> Self {
        Self::Network {
            stage,
            diagnostic: Diagnostic::new(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::DatasetNotFound(_) => ErrorKind::DatasetNotFound,
            Self::DataFormat(_) => ErrorKind::DataFormat,
            Self::MultipleFiles { .. } => ErrorKind::MultipleFiles,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Network { .. } => ErrorKind::Network,
        }
    }

    /// True for `DataFormat` and its refinements (`MultipleFiles`, `UnsupportedFormat`).
    pub fn is_data_format(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DataFormat | ErrorKind::MultipleFiles | ErrorKind::UnsupportedFormat
        )
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::Auth(d)
            | Self::DatasetNotFound(d)
            | Self::DataFormat(d)
            | Self::UnsupportedFormat(d) => d,
            Self::MultipleFiles { diagnostic, .. } | Self::Network { diagnostic, .. } => {
                diagnostic
            }
        }
    }

    fn diagnostic_mut(&mut self) -> &mut Diagnostic {
        match self {
            Self::Auth(d)
            | Self::DatasetNotFound(d)
            | Self::DataFormat(d)
            | Self::UnsupportedFormat(d) => d,
            Self::MultipleFiles { diagnostic, .. } | Self::Network { diagnostic, .. } => {
                diagnostic
            }
        }
    }

    pub fn message(&self) -> &str {
        &self.diagnostic().message
    }

    pub fn fix_suggestion(&self) -> Option<&str> {
        self.diagnostic().fix_suggestion.as_deref()
    }

    pub fn docs_link(&self) -> Option<&str> {
        self.diagnostic().docs_link.as_deref()
    }

    /// Candidate file names carried by `MultipleFiles`; empty otherwise.
    pub fn candidates(&self) -> &[String] {
        match self {
            Self::MultipleFiles { candidates, .. } => candidates,
            _ => &[],
        }
    }

    pub fn network_stage(&self) -> Option<NetworkStage> {
        match self {
            Self::Network { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn with_fix_suggestion(mut self, fix: impl Into<String>) -> Self {
        self.diagnostic_mut().fix_suggestion = Some(fix.into());
        self
    }

    pub fn with_docs_link(mut self, link: impl Into<String>) -> Self {
        self.diagnostic_mut().docs_link = Some(link.into());
        self
    }
}
