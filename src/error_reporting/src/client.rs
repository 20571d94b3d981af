use std::future::Future;
use std::panic::Location;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{ConfigLoader, Configuration};
use crate::logging::{setup_logging, Logger, TracingLogger};
use crate::message::{ErrorMessage, ExceptionInfo};
use crate::message_factory::make_factory;
use crate::request_handler::{RequestHandler, SendOutcome};
use crate::transport::{HttpTransport, Transport};

type Factory = Arc<dyn Fn() -> ErrorMessage + Send + Sync>;

/// Entry point for applications: a message factory and a request handler
/// bound to one configuration.
///
/// ```no_run
/// # async fn run() -> anyhow::Result<()> {
/// let reporting = error_reporting::ErrorReporting::from_default_config()?;
/// let outcome = reporting.report_message("cache warmup failed").await;
/// if let Some(error) = outcome.error {
///     eprintln!("report not delivered: {error}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ErrorReporting {
    factory: Factory,
    handler: RequestHandler,
}

impl ErrorReporting {
    /// Loads the configuration from defaults and `ERROR_REPORTING_*`
    /// variables, installs stderr logging at its `log_level` unless the
    /// application already set a global subscriber, and reports over HTTPS.
    pub fn from_default_config() -> Result<Self> {
        let config = ConfigLoader::load_default_config()?;
        if let Err(e) = setup_logging(&config) {
            tracing::debug!("Keeping the existing tracing subscriber: {:#}", e);
        }
        Self::new(config)
    }

    /// Must be called from within a Tokio runtime.
    pub fn new(config: Configuration) -> Result<Self> {
        let transport =
            HttpTransport::new(&config).context("Failed to create Error Reporting transport")?;
        Ok(Self::with_transport(
            config,
            Arc::new(TracingLogger),
            Arc::new(transport),
        ))
    }

    pub fn with_transport(
        config: Configuration,
        logger: Arc<dyn Logger>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let factory: Factory = Arc::new(make_factory(&config));
        let handler = RequestHandler::new(Arc::new(config), logger, transport);
        Self { factory, handler }
    }

    /// A fresh report carrying the caller's stack.
    pub fn event(&self) -> ErrorMessage {
        (self.factory)()
    }

    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    pub async fn wait_for_bootstrap(&self) {
        self.handler.wait_for_bootstrap().await;
    }

    pub async fn send(&self, message: &ErrorMessage) -> SendOutcome {
        self.handler.send_error(message).await
    }

    /// Reports `error` with its `source()` chain.
    pub async fn report(&self, error: &(dyn std::error::Error + 'static)) -> SendOutcome {
        let mut message = self.event();
        message.set_exception(ExceptionInfo::from_error(error));
        self.send(&message).await
    }

    /// Reports an `anyhow` error with its context chain and backtrace.
    pub async fn report_anyhow(&self, error: &anyhow::Error) -> SendOutcome {
        let mut message = self.event();
        message.set_exception(ExceptionInfo::from_anyhow(error));
        self.send(&message).await
    }

    /// Reports a free-text message. When no stack could be captured the
    /// caller's location is attached instead.
    #[track_caller]
    pub fn report_message(
        &self,
        text: impl Into<String>,
    ) -> impl Future<Output = SendOutcome> + Send + '_ {
        let caller = Location::caller();
        let mut message = self.event();
        message.set_message(text);
        if message.auto_generated_stack_trace().map_or(true, str::is_empty) {
            message
                .set_file_path(caller.file())
                .set_line_number(caller.line());
        }

        async move { self.send(&message).await }
    }

    /// Sends in the background; `callback` receives the outcome.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn report_with<F>(&self, message: ErrorMessage, callback: Option<F>)
    where
        F: FnOnce(SendOutcome) + Send + 'static,
    {
        self.handler.send_error_with(message, callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReportMode, ServiceContext};
    use crate::transport::{ApiResponse, MockTransport, ReportRequest};
    use serde_json::json;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "failed to load profile")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    fn reporting(transport: MockTransport) -> ErrorReporting {
        let config = Configuration::builder()
            .service_context(ServiceContext::new("billing").with_version("2.1.0"))
            .report_mode(ReportMode::Always)
            .key("abc")
            .build();
        ErrorReporting::with_transport(config, Arc::new(TracingLogger), Arc::new(transport))
    }

    fn accepting_transport(check: fn(&ReportRequest) -> bool) -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .withf(|request: &ReportRequest| request.body == json!({}))
            .times(1)
            .returning(|_| Ok(ApiResponse::new(200, json!({}))));
        transport
            .expect_request()
            .withf(move |request: &ReportRequest| check(request))
            .times(1)
            .returning(|_| Ok(ApiResponse::new(200, json!({}))));
        transport
    }

    #[tokio::test]
    async fn test_report_renders_source_chain() {
        let reporting = reporting(accepting_transport(|request| {
            request.body["message"]
                .as_str()
                .is_some_and(|message| {
                    message.starts_with("failed to load profile\nCaused by: no such file")
                })
                && request.body["serviceContext"]["service"] == json!("billing")
        }));
        reporting.wait_for_bootstrap().await;

        let error = Outer(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let outcome = reporting.report(&error).await;

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_report_message_starts_with_text() {
        let reporting = reporting(accepting_transport(|request| {
            request.body["message"]
                .as_str()
                .is_some_and(|message| message.starts_with("quota exceeded"))
        }));
        reporting.wait_for_bootstrap().await;

        let outcome = reporting.report_message("quota exceeded").await;

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_event_uses_configured_service() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .returning(|_| Ok(ApiResponse::new(200, json!({}))));
        let reporting = reporting(transport);
        reporting.wait_for_bootstrap().await;

        let event = reporting.event();

        assert_eq!(
            event.service_context(),
            &ServiceContext::new("billing").with_version("2.1.0")
        );
    }
}
