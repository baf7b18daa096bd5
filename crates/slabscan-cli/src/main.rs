//! Terminal client: submit card images to the relay and render the result
//! as it streams in.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use futures_util::StreamExt;
use log::warn;

use slabscan::client::{
    batch_view, encode_image_file, render_lines, AnalysisSession, RelayClient,
};

#[derive(Parser)]
#[command(name = "slabscan", version, about = "Analyze PSA-graded NBA card images")]
struct Options {
    /// Image files to analyze, in submission order.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Base URL of the relay.
    #[arg(long, default_value = "http://127.0.0.1:8787", env = "SLABSCAN_RELAY_URL")]
    relay: String,
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    if tracing_log::LogTracer::init().is_err() {
        eprintln!("log bridge already initialized");
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set");
    }
}

/// Repaints the result block in place.
fn redraw(session: &AnalysisSession, painted: &mut usize) {
    let view = batch_view(&session.snapshot());
    let lines = render_lines(&view);

    if *painted > 0 {
        print!("\x1b[{}A\x1b[J", painted);
    }
    for line in &lines {
        println!("{}", line);
    }
    *painted = lines.len();
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() {
    init_logging();
    let options = Options::parse();

    let mut selected = Vec::with_capacity(options.images.len());
    for path in &options.images {
        match encode_image_file(path) {
            Ok(image) => selected.push(image),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        }
    }

    let mut session = AnalysisSession::new();
    if let Err(e) = session.select_images(selected) {
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let payload = match session.begin_submission() {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    println!("Submitting {} image(s) for analysis...", payload.len());

    let client = RelayClient::new(&options.relay);
    let mut painted = 0usize;

    match client.stream_analysis(payload).await {
        Ok(mut chunks) => {
            redraw(&session, &mut painted);

            let mut stream_failed = false;
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        session.apply_chunk(&chunk);
                        redraw(&session, &mut painted);
                    }
                    Err(e) => {
                        session.fail(&e.to_string());
                        stream_failed = true;
                        break;
                    }
                }
            }
            if !stream_failed {
                session.complete();
            }
            redraw(&session, &mut painted);
        }
        Err(e) => {
            session.fail(&e.to_string());
            redraw(&session, &mut painted);
        }
    }

    if let Some(batch) = session.final_batch() {
        println!();
        println!("Analysis complete ({} card(s)).", batch.cards.len());
    } else if session.error().is_none() {
        // Completed but with records still missing fields; the rendered
        // view above is the best available answer.
        warn!("stream ended with an incomplete batch");
    }

    if session.error().is_some() {
        std::process::exit(1);
    }
}
