//! slabscan relay server.
//!
//! Exposes `POST /api/analyze` and forwards each request to the configured
//! inference provider, streaming the structured output back to the caller.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use slabscan::config::{load_config, Config};
use slabscan::provider::GeminiClient;
use slabscan::relay::{create_router, AppState};

#[derive(Parser)]
#[command(name = "slabscan-relay", version, about = "Analysis relay for graded-card extraction")]
struct Options {
    /// Path to the config file. Defaults apply when omitted (API key from
    /// GEMINI_API_KEY).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    if tracing_log::LogTracer::init().is_err() {
        eprintln!("log bridge already initialized");
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set");
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() {
    init_logging();
    let options = Options::parse();

    let config = match &options.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config from {:?}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let api_key = match config.resolve_api_key() {
        Ok(key) => key,
        Err(e) => {
            error!("Failed to resolve provider API key: {}", e);
            std::process::exit(1);
        }
    };

    let analyzer = Arc::new(GeminiClient::new(
        &config.provider.base_url,
        &config.provider.model,
        api_key,
    ));
    let router = create_router(AppState::new(analyzer, config.request_timeout()));

    let bind_address = options
        .bind
        .clone()
        .unwrap_or_else(|| config.relay.bind_address.clone());

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };

    info!(
        "slabscan relay v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        bind_address
    );
    info!(
        "forwarding to {} (model {})",
        config.provider.base_url, config.provider.model
    );

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
