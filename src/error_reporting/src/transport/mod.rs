//! Transport capability used by the request handler, and its HTTP
//! implementation against the Error Reporting API.

mod auth;
mod error;
mod http;
mod retry;

pub use error::{ErrorCategory, TransportError, TransportResult};
pub use http::HttpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameters of a report request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    pub key: String,
}

/// A single call against the API, relative to the project resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRequest {
    pub path: String,
    /// `None` means the transport authenticates with its own OAuth token.
    pub query: Option<ReportQuery>,
    pub body: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `error.message` of a Google API error body.
    pub fn api_error_message(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
    }
}

/// Authentication and request plumbing. Credential refresh, retries and
/// timeouts all live behind this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Acquires credentials ahead of the first request.
    async fn authenticate(&self) -> TransportResult<()>;

    async fn request(&self, request: ReportRequest) -> TransportResult<ApiResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_message() {
        let response = ApiResponse::new(
            400,
            json!({"error": {"code": 400, "message": "Message cannot be empty.", "status": "INVALID_ARGUMENT"}}),
        );
        assert_eq!(response.api_error_message(), Some("Message cannot be empty."));
        assert!(!response.is_success());

        assert_eq!(ApiResponse::new(200, json!({})).api_error_message(), None);
    }
}
