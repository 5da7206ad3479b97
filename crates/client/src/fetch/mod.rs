//! HTTP fetch pipeline used as the worker's network.
//!
//! ### Request identity
//! - Method and absolute URL; fragments are dropped by [`canonicalize`].
//! - Request headers (notably `Accept`) are forwarded verbatim.
//!
//! ### Network contract
//! - Any HTTP status is a successful fetch; only transport failures
//!   (DNS, refused, TLS, timeout, oversized body) are errors.
//! - Redirects are not followed unless configured, so a 3xx reaches the
//!   caller as-is.
//! - Max body bytes: 5MB (configurable)

pub mod scope;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use scope::{Scope, is_local_host};
pub use self::url::{UrlError, canonicalize};

use egecache_core::{AppConfig, CachedEntry, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "egecache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow; 0 returns 3xx responses as-is
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "egecache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 0,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: if config.follow_redirects { 5 } else { 0 },
        }
    }
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
}

impl FetchRequest {
    /// A plain GET request.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: header::HeaderMap::new() }
    }

    /// Set the `Accept` header. Invalid header values are ignored.
    pub fn with_accept(mut self, accept: &str) -> Self {
        if let Ok(value) = header::HeaderValue::from_str(accept) {
            self.headers.insert(header::ACCEPT, value);
        }
        self
    }

    /// Whether the requesting context asked for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Offline => "offline",
        }
    }
}

/// Response handed back to the requesting context.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL this response answers
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Reason phrase (e.g. "OK", "Offline")
    pub status_text: String,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Network, cache or synthesized offline response
    pub source: ResponseSource,
    /// Time taken to fetch in milliseconds (0 unless from the network)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Build a synthetic response with no network involvement.
    pub fn synthetic(url: Url, status: StatusCode, status_text: &str, headers: header::HeaderMap, body: Bytes) -> Self {
        Self { url, status, status_text: status_text.to_string(), headers, bytes: body, source: ResponseSource::Offline, fetch_ms: 0 }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Only complete, non-redirected responses are stored.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Snapshot this response as a storable entry for `request`.
    ///
    /// Header values that are not valid UTF-8 are dropped.
    pub fn to_entry(&self, request: &FetchRequest) -> CachedEntry {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        CachedEntry {
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            status: self.status.as_u16(),
            status_text: self.status_text.clone(),
            headers,
            body: self.bytes.to_vec(),
            stored_at: Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a stored entry.
    pub fn from_entry(entry: &CachedEntry) -> Result<Self, Error> {
        let url = Url::parse(&entry.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;
        let status = StatusCode::from_u16(entry.status)
            .map_err(|e| Error::CorruptEntry(format!("status {}: {e}", entry.status)))?;

        let mut headers = header::HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) =
                (header::HeaderName::from_bytes(name.as_bytes()), header::HeaderValue::from_str(value))
            {
                headers.append(name, value);
            }
        }

        Ok(Self {
            url,
            status,
            status_text: entry.status_text.clone(),
            headers,
            bytes: Bytes::from(entry.body.clone()),
            source: ResponseSource::Cache,
            fetch_ms: 0,
        })
    }
}

/// The network as seen by the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request once. Non-2xx statuses are not errors.
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
        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(redirect)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn map_send_error(&self, url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{url} after {}ms", self.config.timeout.as_millis()))
        } else {
            Error::HttpError(format!("network error: {}", err))
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| self.map_send_error(&request.url, e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(&request.url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse {
            url: request.url.clone(),
            status,
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            bytes,
            source: ResponseSource::Network,
            fetch_ms,
        })
    }
}
