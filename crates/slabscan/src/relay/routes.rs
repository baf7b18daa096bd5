//! Route table and shared state for the relay.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::Router;

use crate::provider::CardAnalyzer;

/// Wall-clock ceiling for one analyze request, setup and streaming
/// included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared relay state. Holds no per-request data; concurrent requests are
/// fully independent.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn CardAnalyzer>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn CardAnalyzer>, request_timeout: Duration) -> Self {
        Self {
            analyzer,
            request_timeout,
        }
    }
}

/// Creates the relay router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(super::handlers::analyze))
        .with_state(state)
}
