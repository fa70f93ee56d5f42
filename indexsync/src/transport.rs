//! HTTP transport shared by every stage
//!
//! One `reqwest::Client` carries the `api-key` header on every call. The
//! key is marked sensitive so it never shows up in `Debug` output.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ServiceConfig;
use crate::error::{Result, SyncError};

pub const DEFAULT_API_VERSION: &str = "2020-06-30";

const API_KEY_HEADER: &str = "api-key";

/// Client for the search service's REST management surface
#[derive(Debug, Clone)]
pub struct SearchServiceClient {
    http: Client,
    base_url: Url,
    api_version: String,
}

/// Error envelope returned by the service on failed requests
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl SearchServiceClient {
    /// Create a client against `base_url` with default timeout and API version
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_options(base_url, api_key, DEFAULT_API_VERSION, Duration::from_secs(30))
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        Self::with_options(
            &base_url,
            &config.api_key,
            &config.api_version,
            config.request_timeout(),
        )
    }

    pub fn with_options(
        base_url: &str,
        api_key: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(SyncError::config("search service API key is not set"));
        }

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| SyncError::config("search service API key is not a valid header value"))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        // Trailing slash so relative joins append instead of replacing the last segment
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;

        Ok(Self {
            http,
            base_url,
            api_version: api_version.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a service-relative path, appending the `api-version` query parameter
    pub fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Send a request and require one of the `accepted` status codes.
    ///
    /// Network failures surface as `Transport`; any other status becomes a
    /// `Request` error carrying the service's message.
    pub async fn call<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        accepted: &[StatusCode],
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let operation = format!("{} {}", method, path);

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!(operation = %operation, status = %response.status(), "search service call");

        expect_status(response, &operation, accepted).await
    }

    /// `call` without a request body
    pub async fn call_empty(
        &self,
        method: Method,
        path: &str,
        accepted: &[StatusCode],
    ) -> Result<Response> {
        self.call::<()>(method, path, None, accepted).await
    }
}

/// Pass the response through if its status is accepted, else build a `Request` error
pub async fn expect_status(
    response: Response,
    operation: &str,
    accepted: &[StatusCode],
) -> Result<Response> {
    let status = response.status();
    if accepted.contains(&status) {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Request {
        operation: operation.to_string(),
        status,
        message: remote_message(&body, status),
    })
}

fn remote_message(body: &str, status: StatusCode) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.to_string()
    }
}
