use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use super::auth::TokenProvider;
use super::retry::send_with_retry;
use super::{ApiResponse, ReportRequest, Transport, TransportError, TransportResult};
use crate::config::Configuration;
use crate::constants::RETRY_DELAY_MS;

/// [`Transport`] over HTTPS against `{api_endpoint}/projects/{project_id}/`.
pub struct HttpTransport {
    client: Client,
    api_endpoint: String,
    project_id: OnceCell<String>,
    tokens: TokenProvider,
    max_retries: usize,
    retry_delay: Duration,
}

impl HttpTransport {
    pub fn new(config: &Configuration) -> TransportResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            tokens: TokenProvider::new(
                client.clone(),
                config.key_filename().map(|path| path.to_path_buf()),
                config.metadata_endpoint(),
            ),
            client,
            api_endpoint: config.api_endpoint().to_string(),
            project_id: OnceCell::new_with(config.project_id().map(str::to_string)),
            max_retries: config.max_retries(),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn project_id(&self) -> TransportResult<&str> {
        self.project_id
            .get_or_try_init(|| self.tokens.project_id())
            .await
            .map(String::as_str)
    }

    async fn request_url(&self, request: &ReportRequest) -> TransportResult<Url> {
        let project_id = self.project_id().await?;
        let mut url = Url::parse(&format!(
            "{}/projects/{}/{}",
            self.api_endpoint, project_id, request.path
        ))?;

        if let Some(query) = &request.query {
            url.query_pairs_mut().append_pair("key", &query.key);
        }
        Ok(url)
    }

    async fn send_once(
        &self,
        url: &Url,
        bearer_token: Option<&str>,
        body: &Value,
    ) -> TransportResult<ApiResponse> {
        let mut builder = self.client.post(url.clone()).json(body);
        if let Some(token) = bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let response = ApiResponse::new(status, parse_body(&text));

        if response.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Api { response })
        }
    }
}

/// Empty bodies read as `{}`; anything that is not JSON is kept as a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn authenticate(&self) -> TransportResult<()> {
        self.tokens.access_token().await?;
        debug!("Error Reporting credentials are ready");
        Ok(())
    }

    async fn request(&self, request: ReportRequest) -> TransportResult<ApiResponse> {
        let url = self.request_url(&request).await?;
        let bearer_token = match request.query {
            Some(_) => None,
            None => Some(self.tokens.access_token().await?),
        };

        send_with_retry(url.path(), self.max_retries, self.retry_delay, || {
            self.send_once(&url, bearer_token.as_deref(), &request.body)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{METADATA_TOKEN_PATH, REPORT_PATH};
    use crate::transport::ReportQuery;
    use httpmock::prelude::*;

    const REPORT_URL_PATH: &str = "/projects/test-project/events:report";

    fn transport(server: &MockServer) -> HttpTransport {
        let config = Configuration::builder()
            .project_id("test-project")
            .api_endpoint(server.base_url())
            .metadata_endpoint(server.base_url())
            .max_retries(2)
            .build();
        HttpTransport::new(&config)
            .unwrap()
            .with_retry_delay(Duration::ZERO)
    }

    fn report(query: Option<ReportQuery>) -> ReportRequest {
        ReportRequest {
            path: REPORT_PATH.to_string(),
            query,
            body: json!({"message": "boom"}),
        }
    }

    #[tokio::test]
    async fn test_static_key_is_sent_as_query_parameter() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(REPORT_URL_PATH)
                .query_param("key", "abc")
                .json_body(json!({"message": "boom"}));
            then.status(200)
                .header("content-type", "application/json")
                .body("{}");
        });

        let response = transport(&server)
            .request(report(Some(ReportQuery {
                key: "abc".to_string(),
            })))
            .await
            .unwrap();

        assert_eq!(response, ApiResponse::new(200, json!({})));
        mock.assert();
    }

    #[tokio::test]
    async fn test_without_key_uses_bearer_token() {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(GET).path(METADATA_TOKEN_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"oauth-token","expires_in":3600}"#);
        });
        let report_mock = server.mock(|when, then| {
            when.method(POST)
                .path(REPORT_URL_PATH)
                .header("authorization", "Bearer oauth-token");
            then.status(200).body("");
        });

        let transport = transport(&server);
        transport.authenticate().await.unwrap();
        let response = transport.request(report(None)).await.unwrap();

        assert_eq!(response.body, json!({}));
        token_mock.assert_hits(1);
        report_mock.assert();
    }

    #[tokio::test]
    async fn test_bad_request_is_parsed_into_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(REPORT_URL_PATH);
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error":{"code":400,"message":"Message cannot be empty.","status":"INVALID_ARGUMENT"}}"#);
        });

        let err = transport(&server)
            .request(report(Some(ReportQuery {
                key: "abc".to_string(),
            })))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.is_empty_message_rejection());
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(REPORT_URL_PATH);
            then.status(503).body("unavailable");
        });

        let err = transport(&server)
            .request(report(Some(ReportQuery {
                key: "abc".to_string(),
            })))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(
            err.response().map(|response| response.body.clone()),
            Some(json!("unavailable"))
        );
        mock.assert_hits(3);
    }

    #[tokio::test]
    async fn test_missing_project_id_fails_before_sending() {
        let server = MockServer::start();
        let config = Configuration::builder()
            .api_endpoint(server.base_url())
            .metadata_endpoint(server.base_url())
            .build();

        let err = HttpTransport::new(&config)
            .unwrap()
            .request(report(Some(ReportQuery {
                key: "abc".to_string(),
            })))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::MissingProjectId), "got {err}");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), json!({}));
        assert_eq!(parse_body(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_body("<html>"), json!("<html>"));
    }
}
