use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ThinError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("Zip Archive Error: {0}")]
    Zip(#[from] Arc<zip::result::ZipError>),

    #[error("XML Parsing Error: {0}")]
    Xml(#[from] Arc<quick_xml::DeError>),

    #[error("URL Parsing Error: {0}")]
    Url(#[from] Arc<url::ParseError>),

    /// Optional descriptors treat this as "no dependencies".
    #[error("Descriptor not found: {0}")]
    DescriptorNotFound(String),

    #[error("Malformed descriptor {0}: {1}")]
    MalformedDescriptor(String, String),

    #[error("Failed to resolve artifact '{coordinate}'{}: {reason}", format_chain(.chain))]
    ArtifactResolutionFailure {
        coordinate: String,
        chain: Vec<String>,
        reason: String,
    },

    #[error("No entry point class found in {0} (set mainOverride to choose one)")]
    AmbiguousEntryPoint(String),

    #[error("Invalid coordinate '{0}': {1}")]
    InvalidCoordinate(String, String),

    #[error("Invalid archive locator '{0}': {1}")]
    InvalidLocator(String, String),

    #[error("Archive Error: {0}")]
    Archive(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Checksum Mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Launch Error: {0}")]
    Launch(String),
}

fn format_chain(chain: &[String]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" (required by {})", chain.join(" <- "))
    }
}

impl ThinError {
    /// Builds a resolution failure for a single coordinate with no requesting chain.
    pub fn resolution(coordinate: impl Into<String>, reason: impl Into<String>) -> Self {
        ThinError::ArtifactResolutionFailure {
            coordinate: coordinate.into(),
            chain: Vec::new(),
            reason: reason.into(),
        }
    }

    /// Appends a requesting descriptor to the chain of a resolution failure.
    /// Other variants are returned unchanged.
    pub fn required_by(self, requester: impl Into<String>) -> Self {
        match self {
            ThinError::ArtifactResolutionFailure {
                coordinate,
                mut chain,
                reason,
            } => {
                chain.push(requester.into());
                ThinError::ArtifactResolutionFailure {
                    coordinate,
                    chain,
                    reason,
                }
            }
            other => other,
        }
    }
}

impl From<std::io::Error> for ThinError {
    fn from(err: std::io::Error) -> Self {
        ThinError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for ThinError {
    fn from(err: reqwest::Error) -> Self {
        ThinError::Http(Arc::new(err))
    }
}

impl From<zip::result::ZipError> for ThinError {
    fn from(err: zip::result::ZipError) -> Self {
        ThinError::Zip(Arc::new(err))
    }
}

impl From<quick_xml::DeError> for ThinError {
    fn from(err: quick_xml::DeError) -> Self {
        ThinError::Xml(Arc::new(err))
    }
}

impl From<url::ParseError> for ThinError {
    fn from(err: url::ParseError) -> Self {
        ThinError::Url(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ThinError>;
