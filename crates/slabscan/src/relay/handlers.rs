//! Handler for the analyze endpoint.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{Stream, StreamExt};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::routes::AppState;
use crate::error::ProviderError;
use crate::prompt;
use crate::provider::{AnalysisRequest, ImageData, ObjectStream};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub images: Vec<String>,
}

/// Accepts a batch of inline-encoded images and streams back the provider's
/// structured output as raw text.
///
/// One provider call per request, no retries: setup failures become a 500
/// JSON envelope, failures after streaming begins terminate the stream.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    if request.images.is_empty() {
        return (StatusCode::BAD_REQUEST, "No images provided").into_response();
    }

    let request_id = Uuid::new_v4();
    info!(
        "[{}] analyzing batch of {} image(s)",
        request_id,
        request.images.len()
    );

    let deadline = tokio::time::Instant::now() + state.request_timeout;

    let setup = async {
        let images = request
            .images
            .iter()
            .map(|url| ImageData::from_data_url(url))
            .collect::<Result<Vec<_>, _>>()?;

        let analysis = AnalysisRequest {
            system_instruction: prompt::CARD_ANALYSIS_PROMPT.to_string(),
            user_instruction: prompt::user_instruction(images.len()),
            images,
        };

        state.analyzer.analyze(analysis).await
    };

    let stream = match tokio::time::timeout_at(deadline, setup).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            error!("[{}] Error analyzing card batch: {}", request_id, e);
            return analysis_failure(e.to_string());
        }
        Err(_) => {
            error!(
                "[{}] provider call did not start within {:?}",
                request_id, state.request_timeout
            );
            return analysis_failure(format!(
                "analysis did not start within {} seconds",
                state.request_timeout.as_secs()
            ));
        }
    };

    let body = Body::from_stream(bounded(stream, deadline));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn analysis_failure(details: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to analyze card",
            "details": details,
        })),
    )
        .into_response()
}

/// Caps the forwarded stream at the request deadline. The first error item
/// (including the timeout itself) ends the stream, which aborts the chunked
/// response.
fn bounded(
    stream: ObjectStream,
    deadline: tokio::time::Instant,
) -> impl Stream<Item = Result<String, ProviderError>> {
    futures_util::stream::unfold((stream, false), move |(mut stream, done)| async move {
        if done {
            return None;
        }
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(item)) => {
                let done = item.is_err();
                Some((item, (stream, done)))
            }
            Ok(None) => None,
            Err(_) => Some((
                Err(ProviderError::Stream(
                    "analysis exceeded the request deadline".to_string(),
                )),
                (stream, true),
            )),
        }
    })
}
