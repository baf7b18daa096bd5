//! Shared test support: a scripted provider stand-in and payload builders.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;

use slabscan::error::ProviderError;
use slabscan::provider::{AnalysisRequest, CardAnalyzer, ObjectStream};

/// One scripted stream item.
#[derive(Debug, Clone)]
pub enum ScriptItem {
    Chunk(String),
    Fail(String),
}

/// `CardAnalyzer` stand-in: records every request it receives and replays a
/// configured chunk script.
pub struct FakeAnalyzer {
    script: Vec<ScriptItem>,
    setup_error: Option<String>,
    calls: Arc<Mutex<Vec<AnalysisRequest>>>,
}

impl FakeAnalyzer {
    /// Streams the given chunks, then ends cleanly.
    pub fn streaming(chunks: &[&str]) -> Self {
        Self {
            script: chunks.iter().map(|c| ScriptItem::Chunk(c.to_string())).collect(),
            setup_error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails before any stream is opened.
    pub fn failing_setup(message: &str) -> Self {
        Self {
            script: Vec::new(),
            setup_error: Some(message.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Streams the given chunks, then fails mid-stream.
    pub fn with_stream_failure(chunks: &[&str], message: &str) -> Self {
        let mut script: Vec<ScriptItem> =
            chunks.iter().map(|c| ScriptItem::Chunk(c.to_string())).collect();
        script.push(ScriptItem::Fail(message.to_string()));
        Self {
            script,
            setup_error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<AnalysisRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CardAnalyzer for FakeAnalyzer {
    async fn analyze(&self, request: AnalysisRequest) -> Result<ObjectStream, ProviderError> {
        self.calls.lock().unwrap().push(request);

        if let Some(message) = &self.setup_error {
            return Err(ProviderError::Api {
                status: 400,
                message: message.clone(),
            });
        }

        let items: Vec<Result<String, ProviderError>> = self
            .script
            .iter()
            .map(|item| match item {
                ScriptItem::Chunk(text) => Ok(text.clone()),
                ScriptItem::Fail(message) => Err(ProviderError::Stream(message.clone())),
            })
            .collect();

        Ok(futures_util::stream::iter(items).boxed())
    }
}

/// An analyzer whose setup never finishes; for exercising the deadline.
pub struct StalledAnalyzer;

#[async_trait]
impl CardAnalyzer for StalledAnalyzer {
    async fn analyze(&self, _request: AnalysisRequest) -> Result<ObjectStream, ProviderError> {
        futures_util::future::pending::<()>().await;
        unreachable!("pending future resolved")
    }
}

/// A tiny but syntactically valid data URL.
pub fn data_url(seed: &str) -> String {
    format!("data:image/jpeg;base64,{}", seed)
}

/// A complete two-record result document: one valid card, one rejected
/// image.
pub fn two_card_document() -> String {
    serde_json::json!({
        "cards": [
            {
                "isValid": true,
                "playerName": "Luka Doncic",
                "teamName": "Dallas Mavericks",
                "cardYear": "2018",
                "cardBrand": "Panini",
                "cardSeries": "Prizm",
                "cardNumber": "280",
                "psaGrade": "10",
                "psaCertNumber": "55512345",
                "cardType": "Rookie",
                "isRookieCard": true,
                "cardCondition": "Gem Mint",
                "specialFeatures": "Silver Prizm"
            },
            {
                "isValid": false,
                "validationError": "Image too blurry",
                "playerName": "N/A",
                "teamName": "N/A",
                "cardYear": "N/A",
                "cardBrand": "N/A",
                "cardSeries": "N/A",
                "cardNumber": "N/A",
                "psaGrade": "N/A",
                "psaCertNumber": "N/A",
                "cardType": "N/A",
                "isRookieCard": false,
                "cardCondition": "N/A",
                "specialFeatures": "N/A"
            }
        ]
    })
    .to_string()
}

/// Splits a document into small chunks the way a token stream would.
pub fn chunked(document: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in document.chars() {
        current.push(c);
        if current.len() >= size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
