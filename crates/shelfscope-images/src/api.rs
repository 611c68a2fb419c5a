//! Image resolution backend
//!
//! `ImageApi` is the seam between the resolver and the network. The HTTP
//! implementation talks to the analytics backend:
//!
//! - `GET  {base}/api/product-image/{id}` returns `{ image_url?, method? }`
//! - `POST {base}/api/product-images/batch` with `{ ids }` returns
//!   `{ results: { id: { image_url? } } }`

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use shelfscope_core::{Result, ShelfscopeError};
use std::collections::HashMap;
use std::time::Duration;

/// Single lookup response
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub image_url: Option<String>,
    /// How the backend found the image (scrape, catalog, ...)
    #[serde(default)]
    pub method: Option<String>,
}

/// Resolved URL per identifier from a batch call. `None` means the backend
/// answered but had no image.
pub type BatchResult = HashMap<String, Option<String>>;

#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn fetch_one(&self, id: &str) -> Result<ImageResponse>;

    async fn fetch_batch(&self, ids: &[String]) -> Result<BatchResult>;
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: HashMap<String, BatchItem>,
}

#[derive(Debug, Deserialize)]
struct BatchItem {
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    ids: &'a [String],
}

/// `ImageApi` over HTTP with reqwest
#[derive(Debug, Clone)]
pub struct HttpImageApi {
    client: Client,
    base_url: Url,
}

impl HttpImageApi {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, None, Duration::from_secs(30))
    }

    /// Attach the session cookie every backend request must carry
    pub fn with_session(base_url: &str, cookie: &str, timeout: Duration) -> Result<Self> {
        Self::build(base_url, Some(cookie), timeout)
    }

    fn build(base_url: &str, cookie: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ShelfscopeError::Configuration(format!("Invalid API base URL: {}", e)))?;

        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie).map_err(|e| {
                ShelfscopeError::Configuration(format!("Invalid session cookie: {}", e))
            })?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ShelfscopeError::Network(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ShelfscopeError::Configuration("API base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ShelfscopeError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

fn network_err(err: reqwest::Error) -> ShelfscopeError {
    if err.is_decode() {
        ShelfscopeError::InvalidResponse(err.to_string())
    } else {
        ShelfscopeError::Network(err.to_string())
    }
}

#[async_trait]
impl ImageApi for HttpImageApi {
    async fn fetch_one(&self, id: &str) -> Result<ImageResponse> {
        let url = self.endpoint(&["api", "product-image", id])?;
        tracing::debug!(%url, "Fetching product image");

        let response = self.client.get(url).send().await.map_err(network_err)?;
        let response = Self::check(response).await?;
        response.json::<ImageResponse>().await.map_err(network_err)
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<BatchResult> {
        let url = self.endpoint(&["api", "product-images", "batch"])?;
        tracing::debug!(%url, count = ids.len(), "Fetching product image batch");

        let response = self
            .client
            .post(url)
            .json(&BatchRequest { ids })
            .send()
            .await
            .map_err(network_err)?;
        let response = Self::check(response).await?;
        let body = response.json::<BatchResponse>().await.map_err(network_err)?;

        Ok(body
            .results
            .into_iter()
            .map(|(id, item)| (id, item.image_url.filter(|url| !url.is_empty())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_fetch_one_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/product-image/B08X")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"image_url":"https://cdn.example/B08X.jpg","method":"catalog"}"#)
            .expect(1)
            .create_async()
            .await;

        let api = HttpImageApi::new(&server.url()).unwrap();
        let response = api.fetch_one("B08X").await.unwrap();

        assert_eq!(
            response,
            ImageResponse {
                image_url: Some("https://cdn.example/B08X.jpg".to_string()),
                method: Some("catalog".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_one_maps_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/product-image/B08X")
            .with_status(502)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let api = HttpImageApi::new(&server.url()).unwrap();
        let err = api.fetch_one("B08X").await.unwrap_err();

        assert!(matches!(err, ShelfscopeError::Http { status: 502, .. }));
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_fetch_batch_posts_ids_and_sends_session_cookie() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/product-images/batch")
            .match_header("cookie", "session=abc123")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "ids": ["A1", "B2", "C3"]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":{"A1":{"image_url":"https://cdn.example/a.jpg"},"B2":{},"C3":{"image_url":""}}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let api = HttpImageApi::with_session(
            &server.url(),
            "session=abc123",
            Duration::from_secs(5),
        )
        .unwrap();
        let ids = vec!["A1".to_string(), "B2".to_string(), "C3".to_string()];
        let results = api.fetch_batch(&ids).await.unwrap();

        assert_eq!(
            results.get("A1").cloned().flatten().as_deref(),
            Some("https://cdn.example/a.jpg")
        );
        assert_eq!(results.get("B2"), Some(&None));
        assert_eq!(results.get("C3"), Some(&None));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/product-images/batch")
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let api = HttpImageApi::new(&server.url()).unwrap();
        let err = api.fetch_batch(&["A1".to_string()]).await.unwrap_err();
        assert!(matches!(err, ShelfscopeError::InvalidResponse(_)));
    }

    #[test]
    fn test_identifier_is_path_encoded() {
        let api = HttpImageApi::new("https://dash.example/").unwrap();
        let url = api.endpoint(&["api", "product-image", "A/B 1"]).unwrap();
        assert_eq!(url.as_str(), "https://dash.example/api/product-image/A%2FB%201");
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let err = HttpImageApi::new("not a url").unwrap_err();
        assert!(matches!(err, ShelfscopeError::Configuration(_)));
    }
}
