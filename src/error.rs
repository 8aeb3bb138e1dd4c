//! Error types shared by the API client and the zone/delete subsystems

use thiserror::Error;

use crate::filter::FilterError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the remote service and the logic built on top of it
#[derive(Debug, Error)]
pub enum Error {
    /// Requested object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Checksum mismatch on modify/delete
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input (arguments, documents, bad requests)
    #[error("invalid input: {0}")]
    Validation(String),

    /// A multi-step mutation stopped after some steps were already applied
    #[error(
        "{operation} aborted after {applied} change(s) were applied; \
         those changes were not rolled back and may require manual reconciliation: {source}"
    )]
    PartialFailure {
        operation: String,
        applied: usize,
        #[source]
        source: Box<Error>,
    },

    /// Operator declined a confirmation prompt
    #[error("canceled {0}")]
    Canceled(String),

    /// Any other non-success API response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled(_))
    }

    #[cfg(test)]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
