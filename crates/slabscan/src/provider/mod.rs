//! Inference provider abstraction.
//!
//! The relay talks to the provider through [`CardAnalyzer`] so the endpoint
//! can be exercised against a scripted stand-in; [`gemini`] holds the real
//! implementation.

pub mod gemini;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::ProviderError;

pub use gemini::GeminiClient;

/// Ordered stream of raw text deltas that concatenate into one JSON
/// document conforming to the response schema.
pub type ObjectStream = BoxStream<'static, Result<String, ProviderError>>;

/// One inline image, decoded from the self-describing data URL the client
/// submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    /// Base64 payload, without the data-URL prefix.
    pub data: String,
}

impl ImageData {
    /// Parses a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, ProviderError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ProviderError::InvalidImage {
                reason: "missing 'data:' prefix".to_string(),
            })?;

        let (header, payload) = rest.split_once(',').ok_or_else(|| ProviderError::InvalidImage {
            reason: "missing ',' separator".to_string(),
        })?;

        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ProviderError::InvalidImage {
                reason: "image data must be base64-encoded".to_string(),
            })?;

        if mime_type.is_empty() {
            return Err(ProviderError::InvalidImage {
                reason: "missing mime type".to_string(),
            });
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }
}

/// One outbound analysis request: the fixed system instruction, the user
/// instruction naming the exact image count, and the ordered image batch.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub system_instruction: String,
    pub user_instruction: String,
    pub images: Vec<ImageData>,
}

/// Seam between the relay and the hosted multimodal inference service.
///
/// A successful call yields the provider's structured-output stream; the
/// caller forwards it without transformation and never retries.
#[async_trait]
pub trait CardAnalyzer: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<ObjectStream, ProviderError>;
}
