use anyhow::Context;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::error::{ClientError, Result};
use crate::models::JobRequest;

const SUBMIT_SINGLE_DOC_PATH: &str = "/jobs/submit-single-doc-with-template";

/// HTTP client for the C2M API
/// Injects a short-term bearer token from the token manager into every request
pub struct C2mClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API base URL, e.g. https://api.c2m.com/v2
    base_url: String,

    token_manager: Arc<TokenManager>,
}

impl C2mClient {
    /// Create a new API client
    pub fn new(
        token_manager: Arc<TokenManager>,
        base_url: impl Into<String>,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> anyhow::Result<Self> {
        let client = build_http_client(connect_timeout, request_timeout)?;
        Ok(Self::with_client(token_manager, base_url, client))
    }

    /// Create an API client sharing an existing HTTP client
    pub fn with_client(
        token_manager: Arc<TokenManager>,
        base_url: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_manager,
        }
    }

    /// Submit a single document job rendered from a template
    pub async fn submit_job(&self, job: &JobRequest) -> Result<Value> {
        tracing::info!(template_id = %job.template_id, "Submitting job");
        let result = self.post_json(SUBMIT_SINGLE_DOC_PATH, job).await?;
        tracing::info!("Job submitted");
        Ok(result)
    }

    /// POST a JSON body with bearer auth.
    /// A 401/403 drops the cached short token and resends once with a fresh one.
    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let token = self.token_manager.get_valid_token().await?;
        let response = self.send(&url, token.as_str(), body).await?;

        let response = match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!(
                    status = %response.status(),
                    "Bearer token refused, refreshing token and resending..."
                );
                self.token_manager.invalidate_short_token().await;
                let token = self.token_manager.get_valid_token().await?;
                self.send(&url, token.as_str(), body).await?
            }
            _ => response,
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                url = %url,
                response_body = %error_text,
                "HTTP request failed with error response"
            );
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .context("Failed to parse C2M API response")
            .map_err(ClientError::Internal)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<Response> {
        tracing::debug!(url = %url, "Sending HTTP request");

        self.client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    error_kind = error_kind(&e),
                    error = %e,
                    url = %url,
                    "HTTP request error"
                );
                ClientError::Transport(e)
            })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Build a reqwest client with the configured timeouts
pub fn build_http_client(connect_timeout: u64, request_timeout: u64) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout))
        .timeout(Duration::from_secs(request_timeout))
        .build()
        .context("Failed to create HTTP client")
}

/// Categorize a transport error for logging
fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}
