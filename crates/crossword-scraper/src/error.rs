//! Error types for enumeration, extraction, fetching and conversion.

use crate::types::FrameId;

/// Failure of a script executed inside a page frame.
///
/// Distinct from an empty result: an empty string from a script means it ran and found nothing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("script `{script}` failed in frame {frame_id}: {message}")]
pub struct ExecutionError {
    pub frame_id: FrameId,
    pub script: String,
    pub message: String,
}

/// Failure of an out-of-band HTTP GET.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("HTTP GET error code {status} from URL: {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP GET error from URL: {url} ({message})")]
    Transport { url: String, message: String },
}

impl HttpError {
    pub fn url(&self) -> &str {
        match self {
            HttpError::Status { url, .. } | HttpError::Transport { url, .. } => url,
        }
    }
}

/// All errors that can occur while enumerating frames or running a source.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("Frame enumeration failed: {0}")]
    Enumeration(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Http(#[from] HttpError),

    /// A fetch target not covered by granted permissions.
    #[error("Host permission missing for {url}")]
    PermissionMissing {
        url: String,
        permissions: Vec<String>,
    },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected page data: {0}")]
    PageData(String),
}

impl ScrapeError {
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        ScrapeError::InvalidUrl {
            url: url.into(),
            source,
        }
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Failure to turn a raw payload into a normalized puzzle.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("Conversion of {0} payloads is not supported")]
    Unsupported(&'static str),

    #[error("Malformed {format} data: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        ConvertError::Malformed {
            format,
            message: message.into(),
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;
