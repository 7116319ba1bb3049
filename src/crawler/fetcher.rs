//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building HTTP clients with proper user agent strings
//! - GET requests bounded by the task's deadline
//! - Error classification into transient and permanent failures
//!
//! The scheduler only sees the [`Fetcher`] trait, so tests can script
//! responses without a network.

use crate::config::UserAgentConfig;
use crate::crawler::task::{ErrorKind, TaskError};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// Failure of a single fetch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Too many redirects: {0}")]
    Redirect(String),

    #[error("Expected HTML, got {0}")]
    ContentMismatch(String),

    #[error("Failed to read body: {0}")]
    Body(String),
}

impl From<FetchError> for TaskError {
    fn from(error: FetchError) -> Self {
        let kind = match &error {
            FetchError::Timeout => ErrorKind::FetchTimeout,
            FetchError::Connection(_) | FetchError::Body(_) => ErrorKind::FetchConnectionError,
            FetchError::HttpStatus(code) => ErrorKind::from_status(*code),
            FetchError::Redirect(_) => ErrorKind::TooManyRedirects,
            FetchError::ContentMismatch(_) => ErrorKind::MalformedMarkup,
        };
        TaskError::new(kind, error.to_string())
    }
}

/// Source of raw page bodies
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, giving up after `timeout`
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use ladle::config::UserAgentConfig;
/// use ladle::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Ladle".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// [`Fetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a page body
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx with HTML (or no) Content-Type | Body |
    /// | 2xx with another Content-Type | ContentMismatch |
    /// | Non-2xx status | HttpStatus |
    /// | Timeout | Timeout |
    /// | Connection refused, DNS, TLS | Connection |
    /// | More than 10 redirects | Redirect |
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            return Err(FetchError::ContentMismatch(content_type));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })
    }
}

/// Accepts HTML and XHTML; a missing Content-Type is given the benefit of the doubt
fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_redirect() {
        FetchError::Redirect(e.to_string())
    } else {
        FetchError::Connection(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config());
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            user_agent_string(&create_test_config()),
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("Text/HTML"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(is_html_content_type(""));

        assert!(!is_html_content_type("application/json"));
        assert!(!is_html_content_type("image/png"));
    }

    #[test]
    fn test_fetch_error_classification() {
        let kind = |e: FetchError| TaskError::from(e).kind;

        assert_eq!(kind(FetchError::Timeout), ErrorKind::FetchTimeout);
        assert_eq!(
            kind(FetchError::Connection("refused".to_string())),
            ErrorKind::FetchConnectionError
        );
        assert_eq!(
            kind(FetchError::HttpStatus(404)),
            ErrorKind::HttpClientError(404)
        );
        assert_eq!(
            kind(FetchError::HttpStatus(503)),
            ErrorKind::HttpServerError(503)
        );
        assert_eq!(
            kind(FetchError::ContentMismatch("application/pdf".to_string())),
            ErrorKind::MalformedMarkup
        );
        assert_eq!(
            kind(FetchError::Redirect("loop".to_string())),
            ErrorKind::TooManyRedirects
        );
    }
}
