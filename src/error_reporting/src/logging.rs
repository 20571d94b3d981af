use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    prelude::*,
    EnvFilter,
};

use crate::config::Configuration;
use crate::request_handler::ReportError;
use crate::transport::TransportError;

/// Sink for the library's own diagnostics.
///
/// The reporting pipeline never fails loudly; whatever goes wrong while
/// bootstrapping credentials or transmitting a report ends up here.
pub trait Logger: Send + Sync {
    fn error(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>);
    fn info(&self, message: &str);
}

/// Forwards to `tracing` under the `error_reporting` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        match cause {
            Some(cause) => tracing::error!(
                target: "error_reporting",
                error = %cause,
                error_type = error_type(cause),
                "{}",
                message
            ),
            None => tracing::error!(target: "error_reporting", "{}", message),
        }
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "error_reporting", "{}", message);
    }
}

fn error_type(cause: &(dyn std::error::Error + 'static)) -> &'static str {
    if let Some(e) = cause.downcast_ref::<ReportError>() {
        e.category().as_str()
    } else if let Some(e) = cause.downcast_ref::<TransportError>() {
        e.error_category().as_str()
    } else {
        "unknown"
    }
}

/// Parses a `log_level` setting: any `EnvFilter` directive, e.g. `warn` or
/// `error_reporting=debug`.
pub(crate) fn log_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level {:?}", level))
}

/// Installs a global stderr subscriber filtered at the configured
/// `log_level`. Fails when the level does not parse or a global subscriber
/// is already installed.
pub fn setup_logging(config: &Configuration) -> Result<()> {
    let level = config.log_level();
    let filter = log_filter(level)?;

    let stderr_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_level(true)
        .with_timer(SystemTime)
        .with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    tracing::debug!("Logging initialized at level {}", level);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_rejects_invalid_directive() {
        let config = Configuration::builder()
            .log_level("error_reporting=loud")
            .build();
        assert!(setup_logging(&config).is_err());
    }

    #[test]
    fn test_log_filter_accepts_directives() {
        assert!(log_filter("warn").is_ok());
        assert!(log_filter("error_reporting=debug,warn").is_ok());
    }

    #[test]
    fn test_error_type_from_pipeline_errors() {
        let transport = TransportError::Auth("expired".to_string());
        assert_eq!(error_type(&transport), "authentication_error");

        let gated = ReportError::Gated("closed".to_string());
        assert_eq!(error_type(&gated), "policy_gate");

        let io = std::io::Error::other("disk");
        assert_eq!(error_type(&io), "unknown");
    }

    #[test]
    fn test_tracing_logger_accepts_missing_cause() {
        let logger = TracingLogger;
        logger.error("nothing attached", None);
        logger.info("informational");
    }
}
