use std::fmt;

use super::ApiResponse;
use crate::constants::EMPTY_MESSAGE_API_ERROR;

/// Error categories attached to log events as `error_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NetworkFailure,
    Non2xxResponse,
    AuthenticationError,
    ConfigurationError,
    SerializationFailure,
    PolicyGate,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NetworkFailure => "network_failure",
            ErrorCategory::Non2xxResponse => "non_2xx_response",
            ErrorCategory::AuthenticationError => "authentication_error",
            ErrorCategory::ConfigurationError => "configuration_error",
            ErrorCategory::SerializationFailure => "serialization_failure",
            ErrorCategory::PolicyGate => "policy_gate",
        }
    }
}

/// Errors that can occur while talking to the Error Reporting API
#[derive(Debug)]
pub enum TransportError {
    /// Network request failed
    Network(reqwest::Error),

    /// Server returned a non-2XX status code
    Api { response: ApiResponse },

    /// No access token could be obtained
    Auth(String),

    /// Service-account credentials could not be read or used
    Credentials(String),

    /// Neither configuration nor the environment named a project
    MissingProjectId,

    /// The configured endpoint does not form a valid URL
    InvalidUrl(url::ParseError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(e) => write!(f, "Network request failed: {}", e),
            TransportError::Api { response } => match response.api_error_message() {
                Some(message) => write!(f, "Server error {}: {}", response.status, message),
                None => write!(f, "Server error {}: {}", response.status, response.body),
            },
            TransportError::Auth(message) => write!(f, "Authentication failed: {}", message),
            TransportError::Credentials(message) => {
                write!(f, "Invalid credentials: {}", message)
            }
            TransportError::MissingProjectId => write!(
                f,
                "Unable to determine the project id; set project_id or GOOGLE_CLOUD_PROJECT"
            ),
            TransportError::InvalidUrl(e) => write!(f, "Invalid API endpoint: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Network(e) => Some(e),
            TransportError::InvalidUrl(e) => Some(e),
            TransportError::Api { .. }
            | TransportError::Auth(_)
            | TransportError::Credentials(_)
            | TransportError::MissingProjectId => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err)
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err)
    }
}

impl TransportError {
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            TransportError::Network(_) => ErrorCategory::NetworkFailure,
            TransportError::Api { .. } => ErrorCategory::Non2xxResponse,
            TransportError::Auth(_) | TransportError::Credentials(_) => {
                ErrorCategory::AuthenticationError
            }
            TransportError::MissingProjectId | TransportError::InvalidUrl(_) => {
                ErrorCategory::ConfigurationError
            }
        }
    }

    /// The server's response, when there was one.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            TransportError::Api { response } => Some(response),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|response| response.status)
    }

    /// Retry network errors and 5XX responses, never 4XX or local failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Api { response } => response.status >= 500,
            _ => false,
        }
    }

    /// The 400 the API answers to a report without a message. Sending an
    /// empty payload to validate an API key produces exactly this.
    pub fn is_empty_message_rejection(&self) -> bool {
        self.response().is_some_and(|response| {
            response.status == 400 && response.api_error_message() == Some(EMPTY_MESSAGE_API_ERROR)
        })
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
