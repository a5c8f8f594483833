//! Error types for the archiver.

use thiserror::Error;

/// Errors returned by a single request to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    /// HTTP status code, if the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}

/// Errors scoped to a single monitor's archive task.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Requested monitor id is absent from the catalog.
    #[error("monitor {0} not found")]
    MonitorNotFound(u64),

    /// Requested probe id is absent from the catalog.
    #[error("probe {0} not found")]
    ProbeNotFound(u64),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Invalid or missing configuration. Always fatal, raised before any request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential '{0}'")]
    MissingCredential(&'static str),

    #[error("'all' and 'check_id' are mutually exclusive")]
    SelectionConflict,

    #[error("one of 'all' or 'check_id' is required")]
    NoSelection,

    #[error("invalid monitor id '{0}'")]
    InvalidMonitorId(String),

    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}
