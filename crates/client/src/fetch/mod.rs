//! HTTP fetch pipeline used as the controller's network side.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Network abstraction
//! - [`Network`] is the seam the offline controller fetches through.
//! - [`FetchClient`] implements it with reqwest; tests substitute scripted networks.
//! - Any HTTP status is a successful fetch. Only transport failures and
//!   oversized bodies are errors; deciding what to cache is left to the caller.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve, same_origin};

use shelter_core::{CachedResponse, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "mcp-offline/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Hard ceiling on a single request. `None` leaves timing to the caller,
    /// which races the request against its own timer where needed.
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "mcp-offline/0.1".to_string(), max_bytes: 5 * 1024 * 1024, timeout: None, max_redirects: 5 }
    }
}

/// An outgoing request as seen by the interception hook.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: Vec::new(), body: None }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Whether the status counts as ok for caching purposes (200–399).
    pub fn ok(&self) -> bool {
        is_ok_status(self.status.as_u16())
    }

    /// Headers as owned name/value pairs, skipping values that are not UTF-8.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect()
    }
}

impl From<&FetchResponse> for CachedResponse {
    fn from(response: &FetchResponse) -> Self {
        CachedResponse::new(response.status.as_u16(), response.header_pairs(), response.bytes.to_vec())
    }
}

/// Status range the controller treats as a successful response.
pub fn is_ok_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// The network side of the controller.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. Resolves with any HTTP status; errors only on
    /// transport failure.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let mut builder = self.http.request(request.method.clone(), url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", url, e))
            } else {
                Error::Network(format!("{}: {}", url, e))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig::default()).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "mcp-offline/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert!(config.timeout.is_none());
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_is_ok_status() {
        assert!(is_ok_status(200));
        assert!(is_ok_status(204));
        assert!(is_ok_status(304));
        assert!(!is_ok_status(404));
        assert!(!is_ok_status(500));
        assert!(!is_ok_status(199));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/css/styles.css"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("body { margin: 0 }")
                    .insert_header("content-type", "text/css"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/css/styles.css", server.uri())).unwrap();
        let response = client().fetch(&FetchRequest::get(url)).await.unwrap();

        assert!(response.ok());
        assert_eq!(response.content_type.as_deref(), Some("text/css"));
        assert_eq!(&response.bytes[..], b"body { margin: 0 }");
        assert!(response.header_pairs().iter().any(|(k, v)| k == "content-type" && v == "text/css"));

        let cached = CachedResponse::from(&response);
        assert_eq!(cached.status, 200);
        assert_eq!(cached.content_type(), Some("text/css"));
        assert_eq!(cached.body, b"body { margin: 0 }");
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing.html", server.uri())).unwrap();
        let response = client().fetch(&FetchRequest::get(url)).await.unwrap();

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(!response.ok());
    }

    #[tokio::test]
    async fn test_fetch_post_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/contact"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/api/contact", server.uri())).unwrap();
        let request = FetchRequest::new(Method::POST, url)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"a"}"#);
        let response = client().fetch(&request).await.unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.js"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 64]))
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchConfig { max_bytes: 16, ..Default::default() }).unwrap();
        let url = Url::parse(&format!("{}/big.js", server.uri())).unwrap();
        let result = client.fetch(&FetchRequest::get(url)).await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Port 9 (discard) is not expected to be listening on loopback.
        let url = Url::parse("http://127.0.0.1:9/index.html").unwrap();
        let result = client().fetch(&FetchRequest::get(url)).await;

        assert!(matches!(result, Err(ref e) if e.is_network()));
    }
}
