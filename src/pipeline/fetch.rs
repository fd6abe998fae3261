//! Metadata fetching: one authenticated GET per article.
//!
//! The list endpoint returns every entity attached to an article as a JSON
//! array. The fetcher only retrieves the body; interpretation lives in
//! [`super::extract`].

use crate::config::{ArchiveConfig, Credentials};
use crate::error::ArchiveError;
use reqwest::StatusCode;
use tracing::{debug, info};

/// Authenticated client for the repository's list endpoint.
pub struct MetadataFetcher {
    client: reqwest::Client,
    credentials: Credentials,
    api_base: String,
    offset: u32,
    limit: u32,
}

impl MetadataFetcher {
    /// Build a fetcher that sends `config.credentials` with every request.
    pub fn new(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scan2djvu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArchiveError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials: config.credentials.clone(),
            api_base: config.api_base.clone(),
            offset: config.list_offset,
            limit: config.list_limit,
        })
    }

    /// URL listing every entity of one article.
    pub fn metadata_url(&self, identifier: &str) -> String {
        format!(
            "{}/api/list/{}/{}/{}",
            self.api_base, identifier, self.offset, self.limit
        )
    }

    /// Fetch the raw JSON body for `identifier`.
    pub async fn fetch(&self, identifier: &str) -> Result<String, ArchiveError> {
        let url = self.metadata_url(identifier);
        info!("Fetching metadata for {}", identifier);
        debug!("GET {}", url);

        let request_failed = |reason: String| ArchiveError::MetadataRequestFailed {
            identifier: identifier.to_string(),
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ArchiveError::AuthenticationFailed {
                identifier: identifier.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(request_failed(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_failed(e.to_string()))?;
        debug!("{}: {} bytes of metadata", identifier, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(base: &str) -> ArchiveConfig {
        ArchiveConfig::builder()
            .credentials(Credentials::new("user", "secret"))
            .api_base(base)
            .build()
            .unwrap()
    }

    #[test]
    fn url_follows_list_template() {
        let fetcher = MetadataFetcher::new(&config_for("https://repo.example.org/")).unwrap();
        assert_eq!(
            fetcher.metadata_url("0b7e-41"),
            "https://repo.example.org/api/list/0b7e-41/0/500"
        );
    }

    #[tokio::test]
    async fn sends_basic_auth_and_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/list/a1/0/500")
            .match_header("authorization", "Basic dXNlcjpzZWNyZXQ=")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let fetcher = MetadataFetcher::new(&config_for(&server.url())).unwrap();
        let body = fetcher.fetch("a1").await.unwrap();

        assert_eq!(body, "[]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_are_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/list/a1/0/500")
            .with_status(401)
            .create_async()
            .await;

        let fetcher = MetadataFetcher::new(&config_for(&server.url())).unwrap();
        let err = fetcher.fetch("a1").await.unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::AuthenticationFailed { status: 401, .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_fatal() {
        // Bind then drop a listener so the port is known to refuse connections.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let fetcher = MetadataFetcher::new(&config_for(&format!("http://127.0.0.1:{port}"))).unwrap();

        match fetcher.fetch("a1").await.unwrap_err() {
            ArchiveError::MetadataRequestFailed { identifier, url, .. } => {
                assert_eq!(identifier, "a1");
                assert!(url.ends_with("/api/list/a1/0/500"));
            }
            other => panic!("expected MetadataRequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/list/a1/0/500")
            .with_status(503)
            .create_async()
            .await;

        let fetcher = MetadataFetcher::new(&config_for(&server.url())).unwrap();
        let err = fetcher.fetch("a1").await.unwrap_err();
        assert!(err.to_string().contains("503"), "got: {err}");
    }
}
