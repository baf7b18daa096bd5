//! Gemini client: structured-output streaming over SSE.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use log::debug;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{AnalysisRequest, CardAnalyzer, ObjectStream};
use crate::error::ProviderError;
use crate::schema;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Client for the Gemini `streamGenerateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn build_request(
        &self,
        request: &AnalysisRequest,
    ) -> Result<GenerateContentRequest, ProviderError> {
        let response_schema =
            schema::response_schema().map_err(|e| ProviderError::Request(e.to_string()))?;

        let mut parts = Vec::with_capacity(request.images.len() + 1);
        parts.push(Part::Text {
            text: request.user_instruction.clone(),
        });
        for image in &request.images {
            parts.push(Part::Inline {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            });
        }

        Ok(GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema,
            },
        })
    }
}

#[async_trait]
impl CardAnalyzer for GeminiClient {
    async fn analyze(&self, request: AnalysisRequest) -> Result<ObjectStream, ProviderError> {
        let body = self.build_request(&request)?;

        debug!(
            "requesting analysis of {} image(s) from {}",
            request.images.len(),
            self.model
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(sse_text_stream(response.bytes_stream()))
    }
}

// ============================================================================
// Request / response wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

// ============================================================================
// SSE decoding
// ============================================================================

/// Splits an SSE byte stream into complete event data payloads.
#[derive(Debug, Default)]
struct SseParser {
    buf: Vec<u8>,
}

impl SseParser {
    /// Appends bytes and drains every complete (blank-line-terminated)
    /// event, returning the joined `data:` payload of each.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        loop {
            let Some(end) = find_event_end(&self.buf) else {
                break;
            };
            let block: Vec<u8> = self.buf.drain(..end).collect();
            // Blocks end at a blank line, so multibyte characters never
            // straddle the boundary.
            let block = String::from_utf8_lossy(&block);

            let data_lines: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
                .collect();

            if !data_lines.is_empty() {
                payloads.push(data_lines.join("\n"));
            }
        }
        payloads
    }
}

/// Index one past the blank line terminating the first complete event, if
/// any. Handles both `\n\n` and `\r\n\r\n` delimiters.
fn find_event_end(buf: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' {
            if buf[i + 1] == b'\n' {
                return Some(i + 2);
            }
            if i + 2 < buf.len() && buf[i + 1] == b'\r' && buf[i + 2] == b'\n' {
                return Some(i + 3);
            }
        }
        i += 1;
    }
    None
}

/// Extracts the concatenated candidate text from one SSE event payload.
fn extract_delta(payload: &str) -> Result<Option<String>, ProviderError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(payload).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let mut delta = String::new();
    if let Some(candidate) = parsed.candidates.first() {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(text) = &part.text {
                    delta.push_str(text);
                }
            }
        }
    }

    if delta.is_empty() {
        Ok(None)
    } else {
        Ok(Some(delta))
    }
}

struct SseStreamState<E> {
    source: Pin<Box<dyn Stream<Item = Result<Vec<u8>, E>> + Send>>,
    parser: SseParser,
    pending: VecDeque<Result<String, ProviderError>>,
    done: bool,
}

/// Adapts a raw SSE byte stream into a stream of text deltas. The first
/// stream-level or decode error is surfaced once and terminates the stream.
fn sse_text_stream<S, B, E>(source: S) -> ObjectStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: std::fmt::Display + Send + 'static,
{
    let source = source.map(|item| item.map(|bytes| bytes.as_ref().to_vec()));
    let state = SseStreamState {
        source: Box::pin(source),
        parser: SseParser::default(),
        pending: VecDeque::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.done = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.source.next().await {
                Some(Ok(bytes)) => {
                    for payload in state.parser.push(&bytes) {
                        match extract_delta(&payload) {
                            Ok(Some(text)) => state.pending.push_back(Ok(text)),
                            Ok(None) => {}
                            Err(e) => state.pending.push_back(Err(e)),
                        }
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(ProviderError::Stream(e.to_string())), state));
                }
                None => state.done = true,
            }
        }
    })
    .boxed()
}
