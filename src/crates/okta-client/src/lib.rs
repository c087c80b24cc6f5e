//! GET-only wrapper around the Okta management API
//!
//! Every read the system makes against the tenant, whether from the sync
//! writer or from an agent probe program, goes through this wrapper. It
//! honors `Retry-After` on 429, aggregates `Link` headers for pagination,
//! and caps page size at 100.

pub mod error;
pub mod pagination;

pub use error::{OktaError, Result};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tooling::async_utils::retry::{with_retry, RetryPolicy};
use tooling::rate_limit::RateLimiter;

/// Mandatory page size for paginated endpoints
pub const PAGE_LIMIT: u32 = 100;

const MAX_BODY_SNIPPET: usize = 2048;

/// Client configuration
#[derive(Debug, Clone)]
pub struct OktaConfig {
    /// Org base URL, e.g. `https://acme.okta.com`
    pub base_url: String,

    /// API token (sent as `SSWS <token>`)
    pub api_token: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,

    /// Requests allowed per minute; keeps bursts under the org rate limit
    pub requests_per_minute: usize,
}

impl OktaConfig {
    /// Build a configuration with default timeout and retries
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::new(4),
            requests_per_minute: 500,
        }
    }

    /// Load from `OKTA_ORG_URL` and `OKTA_API_TOKEN`
    pub fn from_env() -> Result<Self> {
        let base_url = tooling::config::require("OKTA_ORG_URL")
            .map_err(|e| OktaError::Config(e.to_string()))?;
        let api_token = tooling::config::require("OKTA_API_TOKEN")
            .map_err(|e| OktaError::Config(e.to_string()))?;
        Ok(Self::new(base_url, api_token))
    }
}

/// GET-only management API client
#[derive(Clone)]
pub struct OktaClient {
    config: OktaConfig,
    client: reqwest::Client,
    limiter: RateLimiter,
}

impl OktaClient {
    /// Create a client from a configuration
    pub fn new(config: OktaConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("SSWS {}", config.api_token))
            .map_err(|e| OktaError::Config(e.to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| OktaError::Config(e.to_string()))?;

        let limiter = RateLimiter::new(config.requests_per_minute, Duration::from_secs(60));
        Ok(Self {
            config,
            client,
            limiter,
        })
    }

    /// The configured org base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// GET one resource or page, returning the decoded JSON body.
    ///
    /// Transient failures (429, 5xx, transport) retry under the configured
    /// policy; a 429 waits out the server's `Retry-After` before retrying.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = self.absolute_url(path);
        with_retry(
            &self.config.retry,
            |e: &OktaError| e.is_transient(),
            |e| e.retry_after(),
            || async { self.get_once(&url, query).await.map(|(body, _)| body) },
        )
        .await
    }

    /// GET every page of a collection endpoint, following `Link rel="next"`.
    ///
    /// Injects `limit=100` and concatenates the page arrays.
    pub async fn get_paged(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Value>> {
        let limit = PAGE_LIMIT.to_string();
        let mut first_query: Vec<(&str, &str)> = vec![("limit", limit.as_str())];
        first_query.extend(query.iter().copied().filter(|(k, _)| *k != "limit"));

        let mut items = Vec::new();
        let mut url = self.absolute_url(path);
        let mut query_slice: Option<Vec<(&str, &str)>> = Some(first_query);

        loop {
            let q = query_slice.take().unwrap_or_default();
            let (body, links) = with_retry(
                &self.config.retry,
                |e: &OktaError| e.is_transient(),
                |e| e.retry_after(),
                || async { self.get_once(&url, &q).await },
            )
            .await?;

            match body {
                Value::Array(page) => items.extend(page),
                other => {
                    return Err(OktaError::Decode(format!(
                        "expected a JSON array page, got {}",
                        type_name(&other)
                    )))
                }
            }

            match pagination::next_link(&links) {
                // The next link already carries after/limit parameters.
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(items)
    }

    async fn get_once(&self, url: &str, query: &[(&str, &str)]) -> Result<(Value, Vec<String>)> {
        self.limiter.acquire().await;
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| OktaError::Network(e.to_string()))?;

        let status = response.status();
        let links: Vec<String> = response
            .headers()
            .get_all(reqwest::header::LINK)
            .iter()
            .filter_map(|v| v.to_str().ok().map(|s| s.to_string()))
            .collect();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);
            tracing::warn!(url, retry_after_secs, "upstream rate limit hit");
            return Err(OktaError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(MAX_BODY_SNIPPET);
            return Err(OktaError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| OktaError::Decode(e.to_string()))?;

        Ok((body, links))
    }

    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
