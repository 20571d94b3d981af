mod config_loader;
mod defaults;

pub use config_loader::ConfigLoader;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::constants::{
    API_ENDPOINT, DEFAULT_ENVIRONMENT, DEFAULT_LOG_LEVEL, DEFAULT_SERVICE_NAME, MAX_RETRIES,
    METADATA_ENDPOINT, PRODUCTION_ENVIRONMENT, REQUEST_TIMEOUT_MS,
};

/// Identifies the reporting application to the aggregation backend.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceContext {
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ServiceContext {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE_NAME.to_string(),
            version: None,
        }
    }
}

/// When errors are actually transmitted to the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Only when the detected environment is `production`.
    #[default]
    Production,
    Always,
    /// Reporting is switched off entirely.
    Never,
}

/// Read-only settings consumed by the reporting pipeline.
///
/// Build one directly with [`Configuration::builder`] or load it from
/// defaults, an optional TOML file and the environment with [`ConfigLoader`].
#[derive(Clone, Debug, TypedBuilder)]
pub struct Configuration {
    #[builder(default)]
    service_context: ServiceContext,
    #[builder(default, setter(strip_option, into))]
    project_id: Option<String>,
    #[builder(default, setter(strip_option, into))]
    key: Option<String>,
    #[builder(default, setter(strip_option, into))]
    key_filename: Option<PathBuf>,
    #[builder(default)]
    report_mode: ReportMode,
    #[builder(default = DEFAULT_ENVIRONMENT.to_string(), setter(into))]
    environment: String,
    #[builder(default)]
    ignore_environment_check: bool,
    #[builder(default = DEFAULT_LOG_LEVEL.to_string(), setter(into))]
    log_level: String,
    #[builder(default = API_ENDPOINT.to_string(), setter(into))]
    api_endpoint: String,
    #[builder(default = METADATA_ENDPOINT.to_string(), setter(into))]
    metadata_endpoint: String,
    #[builder(default = REQUEST_TIMEOUT_MS)]
    request_timeout_ms: u64,
    #[builder(default = MAX_RETRIES)]
    max_retries: usize,
}

impl Configuration {
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Static API key. When present, OAuth bootstrapping is skipped.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn key_filename(&self) -> Option<&Path> {
        self.key_filename.as_deref()
    }

    pub fn report_mode(&self) -> ReportMode {
        self.report_mode
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    pub fn metadata_endpoint(&self) -> &str {
        &self.metadata_endpoint
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Global kill switch.
    pub fn is_reporting_enabled(&self) -> bool {
        self.report_mode != ReportMode::Never
    }

    /// The report gate: whether errors go to the API or are only
    /// acknowledged locally.
    pub fn should_report_errors_to_api(&self) -> bool {
        match self.report_mode {
            ReportMode::Never => false,
            ReportMode::Always => true,
            ReportMode::Production => {
                self.ignore_environment_check || self.environment == PRODUCTION_ENVIRONMENT
            }
        }
    }
}
