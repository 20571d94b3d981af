//! The wire payload for a single error report.

mod error_message;
mod exception;
mod request_context;

pub use error_message::{ErrorContext, ErrorMessage, ReportLocation};
pub use exception::ExceptionInfo;
pub use request_context::HttpRequestContext;
