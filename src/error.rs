// Report errors
//
// "No data" is never an error: empty lists and zero counts are valid results.
// Only a rejected parameter or a failed store fetch ends a report early.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The caller passed a value the engine does not recognize (e.g. `dataType`)
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: String, message: String },

    /// The record store could not be read
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    /// The report did not finish before its deadline; the fetch was interrupted
    #[error("report timed out after {0:?}")]
    Timeout(Duration),

    /// The fetch was abandoned by its caller before it finished
    #[error("report cancelled")]
    Cancelled,
}

impl ReportError {
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        ReportError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Rejected-request errors are the caller's fault; everything else is ours
    pub fn is_client_error(&self) -> bool {
        matches!(self, ReportError::InvalidParameter { .. })
    }
}

impl From<rusqlite::Error> for ReportError {
    fn from(err: rusqlite::Error) -> Self {
        ReportError::StoreUnavailable(err.to_string())
    }
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;
