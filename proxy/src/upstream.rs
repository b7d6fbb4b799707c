//! Upstream call execution against the configured Jira deployment.
//!
//! One reqwest client, one attempt per call, a fixed timeout, and an exact
//! classification of every failure into the proxy error taxonomy.

use crate::errors::{ProxyError, Result};
use async_trait::async_trait;
use http::Method;
use serde_json::{Value, json};
use shared::headers::truncate_for_log;
use std::time::Duration;
use url::Url;

/// Per-call timeout for upstream requests.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on upstream bodies quoted in error logs.
const LOG_BODY_LIMIT: usize = 2000;

/// One upstream Jira call. Constructed fresh per call, immutable once built.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path relative to the Jira base URL, e.g. `/rest/api/2/serverInfo`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Headers including exactly one authorization value.
    pub headers: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Seam between the translator and the network.
///
/// The production implementation is [`JiraTransport`]; tests substitute mocks
/// to observe and fail individual calls.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn execute(&self, request: UpstreamRequest) -> Result<Value>;
}

/// reqwest-backed transport. No retries, no pooling budget beyond reqwest's
/// defaults; a failed call converts directly into a typed error.
pub struct JiraTransport {
    client: reqwest::Client,
    base_url: String,
}

impl JiraTransport {
    pub fn new(base_url: &Url) -> Result<Self> {
        Self::with_timeout(base_url, UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(base_url: &Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify_send_error(&self, err: reqwest::Error) -> ProxyError {
        if err.is_timeout() {
            tracing::error!(error = %err, "request to Jira timed out");
            ProxyError::Connection("request to Jira timed out".to_string())
        } else if err.is_connect() {
            tracing::error!(error = %err, "connection error to Jira");
            ProxyError::Connection(format!("unable to connect to Jira at {}", self.base_url))
        } else {
            tracing::error!(error = %err, "unexpected error communicating with Jira");
            ProxyError::Connection(format!(
                "unexpected error communicating with Jira: {err}"
            ))
        }
    }
}

fn classify_status(status: u16, body: &str) -> ProxyError {
    tracing::error!(
        status,
        body = %truncate_for_log(body, LOG_BODY_LIMIT),
        "Jira returned an error status"
    );
    match status {
        401 => ProxyError::Authentication,
        403 => ProxyError::Permission,
        404 => ProxyError::NotFound("Jira resource not found".to_string()),
        400 => ProxyError::Validation("invalid request to Jira API".to_string()),
        _ => ProxyError::Upstream {
            status,
            details: serde_json::from_str(body)
                .unwrap_or_else(|_| json!({ "raw_response": body })),
        },
    }
}

#[async_trait]
impl UpstreamTransport for JiraTransport {
    async fn execute(&self, request: UpstreamRequest) -> Result<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method, &url)
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        if (200..300).contains(&status) {
            // Writes (issue update, transition) come back as 204 No Content
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| {
                tracing::error!(status, error = %e, "Jira returned a non-JSON success body");
                ProxyError::Connection(format!(
                    "unexpected error communicating with Jira: {e}"
                ))
            })
        } else {
            Err(classify_status(status, &text))
        }
    }
}
