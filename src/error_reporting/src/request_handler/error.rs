use std::fmt;

use crate::transport::{ErrorCategory, TransportError};

/// Why a report did not reach the API.
#[derive(Debug)]
pub enum ReportError {
    /// The report gate is closed for the current environment
    Gated(String),

    /// The request failed or the API rejected it
    Transport(TransportError),

    /// The report could not be turned into a request body
    Serialization(serde_json::Error),

    /// The report is missing data the API requires
    InvalidReport(String),
}

impl ReportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::Gated(_) => ErrorCategory::PolicyGate,
            ReportError::Transport(e) => e.error_category(),
            ReportError::Serialization(_) => ErrorCategory::SerializationFailure,
            ReportError::InvalidReport(_) => ErrorCategory::ConfigurationError,
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Gated(message) => write!(f, "{}", message),
            ReportError::Transport(e) => write!(f, "{}", e),
            ReportError::Serialization(e) => write!(f, "Failed to serialize report: {}", e),
            ReportError::InvalidReport(message) => write!(f, "Invalid report: {}", message),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Gated(_) | ReportError::InvalidReport(_) => None,
            ReportError::Transport(e) => Some(e),
            ReportError::Serialization(e) => Some(e),
        }
    }
}

impl From<TransportError> for ReportError {
    fn from(err: TransportError) -> Self {
        ReportError::Transport(err)
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Serialization(err)
    }
}
