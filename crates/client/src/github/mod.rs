//! GitHub Gists API client.
//!
//! Provides a client for the GitHub Gists REST API with rate limiting,
//! error mapping, and response normalization.
//!
//! ### Specification
//!
//! - **Endpoint**: `GET https://api.github.com/gists/{id}`
//! - **Authentication**: optional `Authorization: Bearer <token>`; anonymous
//!   requests work with a much lower hourly quota.
//! - **Rate limiting**: minimum interval between requests (client-side
//!   pacing; the API's own 403/429 responses map to `FetchError::RateLimited`).
//! - **Normalization**: converts the REST payload into the core `Gist`.

pub mod response;

pub use response::{ApiGist, ApiGistFile};

use async_trait::async_trait;
use gistcache_core::{AppConfig, FetchError, Gist, GistClient};
use reqwest::header;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default base URL for the GitHub REST API.
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent. GitHub rejects requests without one.
const DEFAULT_USER_AGENT: &str = "gistcache/0.1";

/// API version header value pinned for stable payload shapes.
const API_VERSION: &str = "2022-11-28";

/// Minimum interval between requests (anonymous quota is 60/hour).
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// GitHub API client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Optional token for authenticated requests.
    pub token: Option<String>,
    /// Base URL (default: https://api.github.com).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: gistcache/0.x).
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GitHubConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads GISTCACHE_GITHUB_TOKEN, falling back to GITHUB_TOKEN. A missing
    /// token is fine: the gists API accepts anonymous requests.
    pub fn from_env() -> Self {
        let token = std::env::var("GISTCACHE_GITHUB_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .ok();

        Self { token, ..Default::default() }
    }
}

impl From<&AppConfig> for GitHubConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            token: config.github_token.clone(),
            base_url: config.api_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// GitHub Gists API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl GitHubClient {
    /// Create a new GitHub client with the given configuration.
    pub fn new(config: GitHubConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, rate_limiter: Arc::new(RateLimiter::new(MIN_REQUEST_INTERVAL)) })
    }

    /// Create a new GitHub client from environment variables.
    pub fn from_env() -> Result<Self, FetchError> {
        Self::new(GitHubConfig::from_env())
    }

    /// Fetch a gist by identifier.
    ///
    /// This method handles rate limiting, status mapping, and response
    /// normalization.
    pub async fn get_gist(&self, id: &str) -> Result<Gist, FetchError> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let url = format!("{}/gists/{}", self.config.base_url, id);

        tracing::debug!("fetching gist {id}");

        let mut request = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(header::USER_AGENT, &self.config.user_agent);

        if let Some(token) = &self.config.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        tracing::debug!("gist API response status: {status}");

        if status == 404 {
            return Err(FetchError::NotFound { id: id.to_string() });
        }

        if status == 401 {
            return Err(FetchError::AuthFailed);
        }

        // 403 on this endpoint is the rate-limit response for anonymous
        // callers that exhausted their quota.
        if status == 403 || status == 429 {
            return Err(FetchError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::HttpStatus { status: status.as_u16() });
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let api_gist: ApiGist = serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::debug!(
            "fetched gist {} in {:?}, {} files",
            id,
            start.elapsed(),
            api_gist.files.len()
        );

        Ok(api_gist.into())
    }
}

fn map_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() { FetchError::Timeout } else { FetchError::Network(err.to_string()) }
}

#[async_trait]
impl GistClient for GitHubClient {
    async fn fetch(&self, id: &str) -> Result<Gist, FetchError> {
        self.get_gist(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_missing_token() {
        let original = std::env::var("GISTCACHE_GITHUB_TOKEN").ok();
        let original_fallback = std::env::var("GITHUB_TOKEN").ok();
        unsafe {
            std::env::remove_var("GISTCACHE_GITHUB_TOKEN");
            std::env::remove_var("GITHUB_TOKEN");
        }

        let config = GitHubConfig::from_env();
        assert!(config.token.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        if let Some(token) = original {
            unsafe {
                std::env::set_var("GISTCACHE_GITHUB_TOKEN", token);
            }
        }
        if let Some(token) = original_fallback {
            unsafe {
                std::env::set_var("GITHUB_TOKEN", token);
            }
        }
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig {
            github_token: Some("test-token".into()),
            api_base_url: "https://github.example.com/api/v3".into(),
            user_agent: "my-site/1.0".into(),
            timeout_ms: 5_000,
            ..Default::default()
        };

        let config = GitHubConfig::from(&app);
        assert_eq!(config.token.as_deref(), Some("test-token"));
        assert_eq!(config.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.user_agent, "my-site/1.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_client_new_anonymous() {
        let config = GitHubConfig::default();
        let client = GitHubClient::new(config);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_paces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
