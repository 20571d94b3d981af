#![allow(dead_code)]

use std::io::Write;

use error_reporting::{Configuration, ReportMode, ServiceContext};
use httpmock::MockServer;
use tempfile::NamedTempFile;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_key.pem");
pub const REPORT_PATH: &str = "/projects/test-project/events:report";

/// Reporting straight to `server` with a static API key.
pub fn key_config(server: &MockServer) -> Configuration {
    Configuration::builder()
        .service_context(ServiceContext::new("checkout").with_version("3.2.1"))
        .project_id("test-project")
        .key("test-key")
        .report_mode(ReportMode::Always)
        .api_endpoint(server.base_url())
        .metadata_endpoint(server.base_url())
        .max_retries(1)
        .build()
}

/// A service-account key file whose token endpoint is `server`.
pub fn service_account_file(server: &MockServer, project_id: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create key file");
    let key = serde_json::json!({
        "type": "service_account",
        "project_id": project_id,
        "client_email": format!("reporter@{project_id}.iam.gserviceaccount.com"),
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": server.url("/token"),
    });
    write!(file, "{}", key).expect("Failed to write key file");
    file
}

pub fn mock_key_validation(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path(REPORT_PATH)
            .query_param("key", "test-key")
            .body("{}");
        then.status(400)
            .header("content-type", "application/json")
            .body(r#"{"error":{"code":400,"message":"Message cannot be empty.","status":"INVALID_ARGUMENT"}}"#);
    })
}
