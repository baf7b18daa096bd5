//! HTTP transport between the submission client and the relay.

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::json;

use crate::error::SessionError;
use crate::stream::Utf8ChunkBuf;

/// Text chunks of the relay's streamed response.
pub type ChunkStream = BoxStream<'static, Result<String, SessionError>>;

/// Thin client for the relay's analyze endpoint.
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submits one ordered batch of data URLs and returns the response text
    /// stream. Non-success statuses become `SessionError::Relay` with the
    /// server's message; transport failures mid-stream surface as stream
    /// error items.
    pub async fn stream_analysis(&self, images: Vec<String>) -> Result<ChunkStream, SessionError> {
        let url = format!("{}/api/analyze", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&json!({ "images": images }))
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Relay {
                status: status.as_u16(),
                message: relay_error_message(&body),
            });
        }

        let mut buf = Utf8ChunkBuf::new();
        let chunks = response
            .bytes_stream()
            .map(move |item| match item {
                Ok(bytes) => Ok(buf.push(&bytes)),
                Err(e) => Err(SessionError::Transport(e.to_string())),
            })
            .boxed();

        Ok(chunks)
    }
}

/// Extracts a display message from an error body. The relay's setup
/// failures arrive as `{"error": ..., "details": ...}`; anything else is
/// shown as-is.
fn relay_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let (Some(error), Some(details)) = (
            value.get("error").and_then(|v| v.as_str()),
            value.get("details").and_then(|v| v.as_str()),
        ) {
            return format!("{}: {}", error, details);
        }
    }
    body.to_string()
}
