use serde_json::{json, Value};

use super::ReportError;
use crate::transport::{ApiResponse, TransportError};

/// Result of one `send_error` call: an error, the raw response and the
/// parsed response body, each present when applicable.
#[derive(Debug)]
pub struct SendOutcome {
    pub error: Option<ReportError>,
    pub response: Option<ApiResponse>,
    pub body: Option<Value>,
}

impl SendOutcome {
    /// Reporting is switched off; the report is acknowledged and dropped.
    pub(crate) fn disabled() -> Self {
        Self {
            error: None,
            response: None,
            body: Some(json!({})),
        }
    }

    pub(crate) fn gated(message: impl Into<String>) -> Self {
        Self {
            error: Some(ReportError::Gated(message.into())),
            response: None,
            body: None,
        }
    }

    pub(crate) fn delivered(response: ApiResponse) -> Self {
        Self {
            error: None,
            body: Some(response.body.clone()),
            response: Some(response),
        }
    }

    /// Keeps whatever the server answered alongside the error.
    pub(crate) fn failed(error: ReportError) -> Self {
        let response = match &error {
            ReportError::Transport(TransportError::Api { response }) => Some(response.clone()),
            _ => None,
        };
        Self {
            body: response.as_ref().map(|response| response.body.clone()),
            response,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Option<ApiResponse>, ReportError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.response),
        }
    }
}
