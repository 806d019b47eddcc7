//! HTTP transport for GCP REST calls
//!
//! Non-success responses become an [`ApiError`] carrying the status and
//! the API's own message, so callers can tell a denied listing from a
//! network failure without parsing strings.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Keep at most [`MAX_LOG_BODY_LENGTH`] printable bytes of a body
fn truncate_for_log(body: &str) -> String {
    let printable: String = body
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();
    if printable.len() <= MAX_LOG_BODY_LENGTH {
        return printable;
    }
    format!(
        "{}... [{} bytes]",
        &printable[..MAX_LOG_BODY_LENGTH],
        body.len()
    )
}

/// A GCP API call answered with a non-success status
#[derive(Debug, Error)]
#[error("API request failed: {status}")]
pub struct ApiError {
    pub status: StatusCode,
    /// `error.message` of the response body, when present
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl ApiError {
    fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|b| b.error.message)
            .filter(|m| !m.is_empty());
        Self { status, message }
    }
}

/// Authenticated JSON client shared by all repositories
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cloudenum/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let request = self.client.post(url).bearer_auth(token);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        self.send(request).await
    }

    /// Send a request and decode its JSON body; an empty body is `Null`
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await.context("Failed to send request")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, truncate_for_log(&body));
            return Err(ApiError::from_response(status, &body).into());
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// One-line, user-facing description of an error from the GCP layer
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    let Some(api) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) else {
        return truncate_for_log(&format!("{:#}", error));
    };

    let hint = match api.status {
        StatusCode::UNAUTHORIZED => {
            "Authentication failed. Run 'gcloud auth application-default login'."
        }
        StatusCode::FORBIDDEN => "Permission denied. Check your GCP IAM permissions.",
        StatusCode::NOT_FOUND => "Resource not found.",
        StatusCode::TOO_MANY_REQUESTS => "Rate limit exceeded. Please try again later.",
        StatusCode::BAD_REQUEST => "Invalid request. Check your parameters.",
        s if s.is_server_error() => "GCP service temporarily unavailable. Please try again.",
        _ => "Request failed.",
    };

    match &api.message {
        Some(message) => format!("{} ({})", hint, truncate_for_log(message)),
        None => hint.to_string(),
    }
}
