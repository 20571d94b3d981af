use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ReportError, SendOutcome};
use crate::config::Configuration;
use crate::constants::{
    KEY_VALIDATION_FAILURE_MESSAGE, OAUTH_FAILURE_MESSAGE, OAUTH_SKIPPED_MESSAGE,
    REPORT_GATED_MESSAGE, REPORT_PATH, SEND_FAILURE_MESSAGE,
};
use crate::logging::Logger;
use crate::message::ErrorMessage;
use crate::transport::{ApiResponse, ReportQuery, ReportRequest, Transport};

/// Query parameters for a report: the static API key, when there is one.
pub fn manufacture_query_string(key: Option<&str>) -> Option<ReportQuery> {
    key.map(|key| ReportQuery {
        key: key.to_string(),
    })
}

/// Decides whether a report is transmitted and, if so, sends it.
///
/// Construction starts credential bootstrapping in the background: an OAuth
/// token fetch when no API key is configured, otherwise a validation request
/// with the key. Neither blocks construction and neither is awaited by
/// [`RequestHandler::send_error`]. Clones share the same transport.
#[derive(Clone)]
pub struct RequestHandler {
    config: Arc<Configuration>,
    logger: Arc<dyn Logger>,
    transport: Arc<dyn Transport>,
    bootstrap: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RequestHandler {
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: Arc<Configuration>,
        logger: Arc<dyn Logger>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let bootstrap = if config.is_reporting_enabled() {
            if config.key().is_some() {
                logger.info(OAUTH_SKIPPED_MESSAGE);
            }
            Some(tokio::spawn(bootstrap_credentials(
                config.clone(),
                logger.clone(),
                transport.clone(),
            )))
        } else {
            debug!("Error reporting is disabled; skipping credential bootstrap");
            None
        };

        Self {
            config,
            logger,
            transport,
            bootstrap: Arc::new(Mutex::new(bootstrap)),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Waits for the background credential bootstrap to finish. Later calls
    /// return immediately.
    pub async fn wait_for_bootstrap(&self) {
        let handle = self.bootstrap.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Credential bootstrap task did not complete: {}", e);
            }
        }
    }

    pub async fn send_error(&self, message: &ErrorMessage) -> SendOutcome {
        if let Some(outcome) = self.local_outcome() {
            return outcome;
        }

        match self.transmit(message).await {
            Ok(response) => {
                debug!("Reported error to {}", self.config.api_endpoint());
                SendOutcome::delivered(response)
            }
            Err(e) => {
                self.logger.error(SEND_FAILURE_MESSAGE, Some(&e));
                SendOutcome::failed(e)
            }
        }
    }

    /// Callback form of [`RequestHandler::send_error`]. The callback runs
    /// exactly once: before this returns when nothing is transmitted,
    /// otherwise from a spawned task after the round-trip.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send_error_with<F>(&self, message: ErrorMessage, callback: Option<F>)
    where
        F: FnOnce(SendOutcome) + Send + 'static,
    {
        if let Some(outcome) = self.local_outcome() {
            if let Some(callback) = callback {
                callback(outcome);
            }
            return;
        }

        let handler = self.clone();
        tokio::spawn(async move {
            let outcome = handler.send_error(&message).await;
            if let Some(callback) = callback {
                callback(outcome);
            }
        });
    }

    /// The outcome for reports that never reach the network.
    fn local_outcome(&self) -> Option<SendOutcome> {
        if !self.config.is_reporting_enabled() {
            return Some(SendOutcome::disabled());
        }
        if !self.config.should_report_errors_to_api() {
            return Some(SendOutcome::gated(REPORT_GATED_MESSAGE));
        }
        None
    }

    async fn transmit(&self, message: &ErrorMessage) -> Result<ApiResponse, ReportError> {
        if message.service_context().service.trim().is_empty() {
            return Err(ReportError::InvalidReport(
                "serviceContext.service must not be empty".to_string(),
            ));
        }

        let request = ReportRequest {
            path: REPORT_PATH.to_string(),
            query: manufacture_query_string(self.config.key()),
            body: serde_json::to_value(message)?,
        };
        Ok(self.transport.request(request).await?)
    }
}

async fn bootstrap_credentials(
    config: Arc<Configuration>,
    logger: Arc<dyn Logger>,
    transport: Arc<dyn Transport>,
) {
    match config.key() {
        None => {
            if let Err(e) = transport.authenticate().await {
                logger.error(OAUTH_FAILURE_MESSAGE, Some(&e));
            }
        }
        Some(key) => {
            let request = ReportRequest {
                path: REPORT_PATH.to_string(),
                query: manufacture_query_string(Some(key)),
                body: json!({}),
            };
            match transport.request(request).await {
                Ok(_) => debug!("API key validation request was accepted"),
                // An empty report is rejected with this exact error when the key is valid.
                Err(e) if e.is_empty_message_rejection() => debug!("API key is valid"),
                Err(e) if e.status() == Some(400) => {
                    logger.error(KEY_VALIDATION_FAILURE_MESSAGE, Some(&e));
                }
                Err(e) => debug!("API key validation did not complete: {}", e),
            }
        }
    }
}
