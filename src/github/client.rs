use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::app::{Result, TrendError};
use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;
use crate::github::{RateLimit, RepoApi, RepoRecord};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const HTML_MEDIA_TYPE: &str = "application/vnd.github.v3.html";
const API_VERSION: &str = "2022-11-28";

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: RateLimit,
}

pub struct GitHubClient {
    client: Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<&str>) -> Result<Self> {
        Self::with_options(token, DEFAULT_API_URL, Duration::from_secs(20))
    }

    pub fn with_options(token: Option<&str>, api_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| TrendError::Config(format!("Invalid API token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, path: &str, accept: &'static str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_url, path))
            .header(ACCEPT, accept)
    }
}

/// Map a non-success response to an error. Rate limiting shows up as 429,
/// or as 403 with either an exhausted remaining count, a `retry-after`
/// header (secondary limits) or a rate-limit message in the body.
fn status_error(status: StatusCode, headers: &HeaderMap, body: &str, url: &str) -> TrendError {
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        == Some("0");
    let retry_after = headers.contains_key(RETRY_AFTER);
    let limited_message = body.to_ascii_lowercase().contains("rate limit");

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (exhausted || retry_after || limited_message))
    {
        TrendError::RateLimitExceeded
    } else {
        TrendError::ApiStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &headers, &body, &url))
}

#[async_trait]
impl RepoApi for GitHubClient {
    async fn rate_limit(&self) -> Result<RateLimit> {
        let response = self.get("/rate_limit", JSON_MEDIA_TYPE).send().await?;
        let response = check(response).await?;
        let body: RateLimitResponse = response.json().await?;
        Ok(body.resources.core)
    }

    async fn repository(&self, name: &str) -> Result<RepoRecord> {
        let response = self
            .get(&format!("/repos/{}", name), JSON_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TrendError::RepoNotFound(name.to_string()));
        }
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    async fn readme_html(&self, full_name: &str) -> Result<Option<String>> {
        let response = self
            .get(&format!("/repos/{}/readme", full_name), HTML_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response).await?;
        Ok(Some(response.text().await?))
    }
}
