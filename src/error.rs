use thiserror::Error;

/// Errors surfaced by the start page core.
///
/// Declined screenshot strategies and timeouts are never errors: they fall
/// through to the next strategy. Only input rejected at the boundary and
/// storage problems show up here.
#[derive(Debug, Error)]
pub enum StartPageError {
    /// User typed something that is not a usable URL
    #[error("Please enter a valid URL: {0}")]
    InvalidUrl(String),

    /// Required form field left empty
    #[error("Please enter both URL and website name")]
    MissingField,

    #[error("Unknown sort method: {0}")]
    UnknownSortMethod(String),

    #[error("Settings storage failed: {0}")]
    Storage(String),

    #[error("Settings file is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    /// Unreadable record was moved aside; the original location is free
    #[error("Unreadable settings moved to {backup:?}: {reason}")]
    Quarantined {
        backup: std::path::PathBuf,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, StartPageError>;
