pub const API_ENDPOINT: &str = "https://clouderrorreporting.googleapis.com/v1beta1";
pub const REPORT_PATH: &str = "events:report";
pub const METADATA_ENDPOINT: &str = "http://metadata.google.internal";
pub const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
pub const METADATA_PROJECT_ID_PATH: &str = "/computeMetadata/v1/project/project-id";
pub const METADATA_FLAVOR_HEADER: (&str, &str) = ("Metadata-Flavor", "Google");
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const DEFAULT_SERVICE_NAME: &str = "rust";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const PRODUCTION_ENVIRONMENT: &str = "production";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const MAX_RETRIES: usize = 2;
pub const RETRY_DELAY_MS: u64 = 500;
/// Tokens are refreshed this long before the server-side expiry.
pub const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

pub const CONFIG_ENV_PREFIX: &str = "ERROR_REPORTING";

// Platform variables consulted when the corresponding setting is absent.
pub const PROJECT_ID_ENV_VARS: &[&str] = &["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const SERVICE_ENV_VARS: &[&str] = &["GAE_SERVICE", "GAE_MODULE_NAME", "K_SERVICE", "FUNCTION_NAME"];
pub const VERSION_ENV_VARS: &[&str] = &["GAE_VERSION", "GAE_MODULE_VERSION", "K_REVISION"];
pub const ENVIRONMENT_ENV_VAR: &str = "APP_ENV";

/// Exact wording the API uses when a report carries no message. Validating an
/// API key with an empty payload is expected to produce it.
pub const EMPTY_MESSAGE_API_ERROR: &str = "Message cannot be empty.";

pub const OAUTH_FAILURE_MESSAGE: &str = "Unable to find credential information on instance. \
     This library will be unable to communicate with the Error Reporting API to save errors.";
pub const OAUTH_SKIPPED_MESSAGE: &str = "API key provided; skipping OAuth2 token request.";
pub const KEY_VALIDATION_FAILURE_MESSAGE: &str =
    "Encountered an error while attempting to validate the provided API key";
pub const SEND_FAILURE_MESSAGE: &str =
    "Encountered an error while attempting to transmit an error to the Error Reporting API.";
pub const REPORT_GATED_MESSAGE: &str = "Error reporting client has not been configured to send \
     errors: the detected environment is not \"production\". Set APP_ENV=production, set \
     report_mode to \"always\" or set ignore_environment_check to true to report errors anyway.";
