use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::{TransportError, TransportResult};
use crate::constants::{
    CLOUD_PLATFORM_SCOPE, DEFAULT_TOKEN_URI, JWT_BEARER_GRANT_TYPE, METADATA_FLAVOR_HEADER,
    METADATA_PROJECT_ID_PATH, METADATA_TOKEN_PATH, TOKEN_EXPIRY_MARGIN_SECS,
};

const JWT_LIFETIME_SECS: u64 = 3600;

/// Service-account key file as downloaded from the cloud console.
#[derive(Debug, Deserialize)]
pub(super) struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
}

impl ServiceAccountKey {
    pub(super) fn from_file(path: &Path) -> TransportResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TransportError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            TransportError::Credentials(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Signed assertion for the JWT bearer grant.
    fn assertion(&self, now: u64) -> TransportResult<String> {
        let claims = JwtClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: self.token_uri(),
            iat: now,
            exp: now + JWT_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| TransportError::Credentials(format!("invalid private key: {}", e)))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| TransportError::Credentials(format!("cannot sign assertion: {}", e)))
    }
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    JWT_LIFETIME_SECS
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

impl AccessToken {
    fn new(response: TokenResponse) -> Self {
        let lifetime = response.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        Self {
            value: response.access_token,
            refresh_at: Instant::now() + Duration::from_secs(lifetime),
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// Obtains and caches OAuth access tokens, either from a service-account
/// key file or from the compute metadata server.
pub(super) struct TokenProvider {
    client: Client,
    key_filename: Option<PathBuf>,
    metadata_endpoint: String,
    cached: RwLock<Option<AccessToken>>,
}

impl TokenProvider {
    pub(super) fn new(
        client: Client,
        key_filename: Option<PathBuf>,
        metadata_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            key_filename,
            metadata_endpoint: metadata_endpoint.into(),
            cached: RwLock::new(None),
        }
    }

    /// A valid bearer token, fetching a new one when the cached token is
    /// missing or about to expire.
    pub(super) async fn access_token(&self) -> TransportResult<String> {
        if let Some(token) = self.cached.read().await.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let mut cached = self.cached.write().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> TransportResult<AccessToken> {
        let response = match &self.key_filename {
            Some(path) => self.fetch_with_service_account(path).await?,
            None => self.fetch_from_metadata_server().await?,
        };
        debug!("Obtained OAuth2 access token valid for {}s", response.expires_in);
        Ok(AccessToken::new(response))
    }

    async fn fetch_with_service_account(&self, path: &Path) -> TransportResult<TokenResponse> {
        let key = ServiceAccountKey::from_file(path)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let assertion = key.assertion(now)?;

        let response = self
            .client
            .post(key.token_uri())
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        parse_token_response(response).await
    }

    async fn fetch_from_metadata_server(&self) -> TransportResult<TokenResponse> {
        let url = format!("{}{}", self.metadata_endpoint, METADATA_TOKEN_PATH);
        let response = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER.0, METADATA_FLAVOR_HEADER.1)
            .query(&[("scopes", CLOUD_PLATFORM_SCOPE)])
            .send()
            .await?;

        parse_token_response(response).await
    }

    /// Project of the service-account key file, else of the metadata server.
    pub(super) async fn project_id(&self) -> TransportResult<String> {
        if let Some(path) = &self.key_filename {
            if let Some(project_id) = ServiceAccountKey::from_file(path)?.project_id {
                return Ok(project_id);
            }
        }

        let url = format!("{}{}", self.metadata_endpoint, METADATA_PROJECT_ID_PATH);
        let response = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER.0, METADATA_FLAVOR_HEADER.1)
            .send()
            .await
            .map_err(|_| TransportError::MissingProjectId)?;

        if !response.status().is_success() {
            return Err(TransportError::MissingProjectId);
        }

        let project_id = response
            .text()
            .await
            .map_err(|_| TransportError::MissingProjectId)?;
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(TransportError::MissingProjectId);
        }
        Ok(project_id.to_string())
    }
}

async fn parse_token_response(response: reqwest::Response) -> TransportResult<TokenResponse> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(TransportError::Auth(format!(
            "token endpoint returned {}: {}",
            status, body
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| TransportError::Auth(format!("unexpected token response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;

    const TEST_PRIVATE_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");

    fn write_key_file(token_uri: &str, project_id: Option<&str>) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let key = serde_json::json!({
            "type": "service_account",
            "client_email": "reporter@test-project.iam.gserviceaccount.com",
            "private_key": TEST_PRIVATE_KEY,
            "token_uri": token_uri,
            "project_id": project_id,
        });
        write!(file, "{}", key).unwrap();
        file
    }

    #[tokio::test]
    async fn test_metadata_server_token_is_cached() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(METADATA_TOKEN_PATH)
                .header("Metadata-Flavor", "Google");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"meta-token","expires_in":3599,"token_type":"Bearer"}"#);
        });

        let provider = TokenProvider::new(Client::new(), None, server.base_url());

        assert_eq!(provider.access_token().await.unwrap(), "meta-token");
        assert_eq!(provider.access_token().await.unwrap(), "meta-token");
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_metadata_server_failure_is_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(METADATA_TOKEN_PATH);
            then.status(404).body("not on GCE");
        });

        let provider = TokenProvider::new(Client::new(), None, server.base_url());
        let err = provider.access_token().await.unwrap_err();

        assert!(matches!(err, TransportError::Auth(_)), "got {err}");
    }

    #[tokio::test]
    async fn test_service_account_uses_jwt_bearer_grant() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .body_includes("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
                .body_includes("assertion=");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"sa-token","expires_in":3600}"#);
        });
        let key_file = write_key_file(&server.url("/token"), Some("test-project"));

        let provider = TokenProvider::new(
            Client::new(),
            Some(key_file.path().to_path_buf()),
            server.base_url(),
        );

        assert_eq!(provider.access_token().await.unwrap(), "sa-token");
        assert_eq!(provider.project_id().await.unwrap(), "test-project");
        mock.assert();
    }

    #[tokio::test]
    async fn test_missing_key_file_is_credentials_error() {
        let provider = TokenProvider::new(
            Client::new(),
            Some(PathBuf::from("/nonexistent/key.json")),
            "http://127.0.0.1:1",
        );

        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, TransportError::Credentials(_)), "got {err}");
    }

    #[tokio::test]
    async fn test_project_id_from_metadata_server() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path(METADATA_PROJECT_ID_PATH)
                .header("Metadata-Flavor", "Google");
            then.status(200).body("meta-project\n");
        });

        let provider = TokenProvider::new(Client::new(), None, server.base_url());

        assert_eq!(provider.project_id().await.unwrap(), "meta-project");
    }
}
