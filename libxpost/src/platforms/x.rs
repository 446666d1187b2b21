//! X (Twitter) API v2 backend

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RemoteError;
use crate::oauth::{sign, OAuthCredentials};
use crate::platforms::{Platform, RemotePost};

pub const DEFAULT_API_BASE: &str = "https://api.x.com/2";

/// Per-request bound so a stalled connection never hangs the tool
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct XPlatform {
    http: reqwest::Client,
    api_base: String,
    credentials: OAuthCredentials,
}

#[derive(Deserialize)]
struct CreateResponse {
    data: RemotePost,
}

impl XPlatform {
    pub fn new(credentials: OAuthCredentials, api_base: impl Into<String>) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn tweets_url(&self) -> String {
        format!("{}/tweets", self.api_base)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status: status.as_u16(),
            detail: error_detail(&body),
        })
    }
}

/// Extract the human-readable message from an API error document
///
/// Prefers `detail`, then the first `errors[].message`, then `title`, and
/// falls back to the raw body.
pub fn error_detail(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(doc) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };

    doc.get("detail")
        .and_then(Value::as_str)
        .or_else(|| {
            doc.get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| first.get("message"))
                .and_then(Value::as_str)
        })
        .or_else(|| doc.get("title").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// JSON body for the create endpoint
pub fn create_body(text: &str, reply_to: Option<&str>) -> Value {
    match reply_to {
        Some(reply_to) => json!({
            "text": text,
            "reply": { "in_reply_to_tweet_id": reply_to },
        }),
        None => json!({ "text": text }),
    }
}

fn network_error(context: &str, err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Network(format!("{} timed out after {}s", context, REQUEST_TIMEOUT.as_secs()))
    } else {
        RemoteError::Network(format!("{} failed: {}", context, err))
    }
}

#[async_trait]
impl Platform for XPlatform {
    async fn create_post(&self, text: &str, reply_to: Option<&str>) -> Result<RemotePost, RemoteError> {
        let url = self.tweets_url();
        // JSON bodies are not part of the OAuth signature
        let authorization = sign("POST", &url, &self.credentials, &[]);

        tracing::debug!(reply_to = ?reply_to, "POST {} ({} chars)", url, text.chars().count());

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&create_body(text, reply_to))
            .send()
            .await
            .map_err(|e| network_error("create post", e))?;

        let response = Self::check_status(response).await?;
        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        tracing::debug!("Created remote post {}", created.data.id);
        Ok(created.data)
    }

    async fn delete_post(&self, remote_id: &str) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.tweets_url(), remote_id);
        let authorization = sign("DELETE", &url, &self.credentials, &[]);

        tracing::debug!("DELETE {}", url);

        let response = self
            .http
            .delete(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| network_error("delete post", e))?;

        Self::check_status(response).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "x"
    }
}
