use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config as RConfig, Environment, File};
use serde::Deserialize;

use super::defaults::first_env_var;
use crate::logging::log_filter;
use super::{Configuration, ReportMode, ServiceContext};
use crate::constants::{
    API_ENDPOINT, CONFIG_ENV_PREFIX, CREDENTIALS_ENV_VAR, DEFAULT_ENVIRONMENT, DEFAULT_LOG_LEVEL,
    DEFAULT_SERVICE_NAME, ENVIRONMENT_ENV_VAR, MAX_RETRIES, METADATA_ENDPOINT, PROJECT_ID_ENV_VARS,
    REQUEST_TIMEOUT_MS, SERVICE_ENV_VARS, VERSION_ENV_VARS,
};

/// Flat shape produced by the layered sources, before platform fallbacks.
#[derive(Debug, Deserialize)]
struct ConfigSettings {
    project_id: Option<String>,
    key: Option<String>,
    key_filename: Option<PathBuf>,
    service: Option<String>,
    version: Option<String>,
    environment: Option<String>,
    report_mode: ReportMode,
    ignore_environment_check: bool,
    log_level: String,
    api_endpoint: String,
    metadata_endpoint: String,
    request_timeout_ms: u64,
    max_retries: usize,
}

impl ConfigSettings {
    fn into_configuration(self) -> Result<Configuration> {
        let service = self
            .service
            .or_else(|| first_env_var(SERVICE_ENV_VARS))
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        if service.trim().is_empty() {
            bail!("service name must not be empty");
        }

        let version = self.version.or_else(|| first_env_var(VERSION_ENV_VARS));
        log_filter(&self.log_level)?;

        Ok(Configuration {
            service_context: ServiceContext { service, version },
            project_id: self
                .project_id
                .filter(|id| !id.trim().is_empty())
                .or_else(|| first_env_var(PROJECT_ID_ENV_VARS)),
            key: self.key.filter(|key| !key.is_empty()),
            key_filename: self
                .key_filename
                .or_else(|| first_env_var(&[CREDENTIALS_ENV_VAR]).map(PathBuf::from)),
            report_mode: self.report_mode,
            environment: self
                .environment
                .or_else(|| first_env_var(&[ENVIRONMENT_ENV_VAR]))
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            ignore_environment_check: self.ignore_environment_check,
            log_level: self.log_level,
            api_endpoint: self.api_endpoint.trim_end_matches('/').to_string(),
            metadata_endpoint: self.metadata_endpoint.trim_end_matches('/').to_string(),
            request_timeout_ms: self.request_timeout_ms,
            max_retries: self.max_retries,
        })
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults overridden by `ERROR_REPORTING_*` environment variables.
    pub fn load_default_config() -> Result<Configuration> {
        Self::load(None)
    }

    /// Defaults, then the optional file, then `ERROR_REPORTING_*` variables.
    /// Settings still missing afterwards fall back to the platform variables
    /// (`GOOGLE_CLOUD_PROJECT`, `K_SERVICE`, `APP_ENV`, ...).
    pub fn load(path: Option<&Path>) -> Result<Configuration> {
        let mut builder = RConfig::builder();

        // set defaults
        builder = builder
            .set_default("report_mode", "production")?
            .set_default("ignore_environment_check", false)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .set_default("api_endpoint", API_ENDPOINT)?
            .set_default("metadata_endpoint", METADATA_ENDPOINT)?
            .set_default("request_timeout_ms", REQUEST_TIMEOUT_MS)?
            .set_default("max_retries", MAX_RETRIES as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(CONFIG_ENV_PREFIX));

        let settings: ConfigSettings = builder
            .build()
            .context("failed to build error reporting config")?
            .try_deserialize()
            .context("failed to parse error reporting config")?;

        settings.into_configuration()
    }
}
