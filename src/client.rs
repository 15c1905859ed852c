//! HTTP transport for probes, image fetches, and gallery pages
//!
//! All network access goes through the [`Transport`] trait so the discovery
//! and fetch machinery can be exercised against scripted implementations in
//! tests. The real implementation holds two `reqwest` clients built once at
//! construction — probe/page traffic with a short timeout, image transfers
//! with a longer one — and never mutates request configuration per call.

use crate::config::HttpConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;

/// Network operations the download pipeline depends on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Lightweight existence check (HEAD, no body transfer).
    ///
    /// Any transport failure — timeout, refused connection, TLS error — is
    /// reported as `false`, never as an error: for the resolver a candidate
    /// that cannot be probed does not exist.
    async fn probe_exists(&self, url: &str) -> bool;

    /// Full-body retrieval of one image.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Retrieve gallery page markup.
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// [`Transport`] backed by `reqwest`.
pub struct HttpTransport {
    /// Short-timeout client for HEAD probes and page markup
    probe: reqwest::Client,
    /// Long-timeout client for full image transfers
    fetch: reqwest::Client,
}

impl HttpTransport {
    /// Build both clients from the HTTP configuration.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut image_headers = HeaderMap::new();
        image_headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/png,image/*;q=0.8,*/*;q=0.5"),
        );

        let probe = client_builder(config, config.probe_timeout)
            .default_headers(image_headers.clone())
            .build()?;
        let fetch = client_builder(config, config.fetch_timeout)
            .default_headers(image_headers)
            .build()?;

        Ok(Self { probe, fetch })
    }
}

fn client_builder(config: &HttpConfig, timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.connect_timeout)
        .timeout(timeout)
        // Mirror hosts routinely serve certificates for the wrong subdomain
        .danger_accept_invalid_certs(true)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe_exists(&self, url: &str) -> bool {
        match self.probe.head(url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::trace!(url, error = %e, "probe transport error, treating as miss");
                false
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.fetch.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.probe.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new(&HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn probe_returns_true_for_200() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/016/abc/1.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = format!("{}/016/abc/1.jpg", server.uri());
        assert!(transport().probe_exists(&url).await);
    }

    #[tokio::test]
    async fn probe_returns_false_for_404() {
        let server = MockServer::start().await;

        let url = format!("{}/016/abc/99.jpg", server.uri());
        assert!(!transport().probe_exists(&url).await);
    }

    #[tokio::test]
    async fn probe_returns_false_for_redirect_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/moved.jpg"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let url = format!("{}/moved.jpg", server.uri());
        assert!(!transport().probe_exists(&url).await);
    }

    #[tokio::test]
    async fn probe_swallows_connection_errors() {
        // Nothing is listening on this port
        assert!(
            !transport()
                .probe_exists("http://127.0.0.1:1/016/abc/1.jpg")
                .await
        );
    }

    #[tokio::test]
    async fn fetch_bytes_returns_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/016/abc/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .mount(&server)
            .await;

        let url = format!("{}/016/abc/1.jpg", server.uri());
        let bytes = transport().fetch_bytes(&url).await.unwrap();
        assert_eq!(bytes, b"jpegdata");
    }

    #[tokio::test]
    async fn fetch_bytes_propagates_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/016/abc/2.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = format!("{}/016/abc/2.jpg", server.uri());
        assert!(transport().fetch_bytes(&url).await.is_err());
    }

    #[tokio::test]
    async fn fetch_page_returns_markup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/g/123/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gallery</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/g/123/", server.uri());
        let markup = transport().fetch_page(&url).await.unwrap();
        assert!(markup.contains("gallery"));
    }
}
