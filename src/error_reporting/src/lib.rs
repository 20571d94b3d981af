//! Client for reporting application errors to the Google Cloud Error
//! Reporting API.
//!
//! Reports are created with a factory that records the caller's stack, then
//! handed to a [`RequestHandler`] that decides whether they are transmitted.
//! [`ErrorReporting`] bundles both behind one configuration.

pub mod client;
pub mod config;
pub mod constants;
pub mod logging;
pub mod message;
pub mod message_factory;
pub mod request_handler;
pub mod stack_trace;
pub mod transport;

pub use client::ErrorReporting;
pub use config::{ConfigLoader, Configuration, ReportMode, ServiceContext};
pub use logging::{setup_logging, Logger, TracingLogger};
pub use message::{ErrorMessage, ExceptionInfo, HttpRequestContext};
pub use message_factory::make_factory;
pub use request_handler::{manufacture_query_string, ReportError, RequestHandler, SendOutcome};
pub use stack_trace::build_stack_trace;
pub use transport::{HttpTransport, Transport, TransportError};
