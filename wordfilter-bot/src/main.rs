//! Wordfilter Bot - Main Entry Point
//!
//! Reads chat events as JSON lines on stdin and writes deletions and command
//! replies as JSON lines on stdout. Logs go to stderr.
//!
//! Usage:
//!     wordfilter-bot --words "spam, scam" --threshold 60
//!     WORDFILTER_WORDS="spam" wordfilter-bot < events.jsonl

use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wordfilter_bot::runtime;
use wordfilter_bot::BotConfig;

#[derive(Parser, Debug)]
#[command(name = "wordfilter-bot")]
#[command(about = "Deletes chat messages that hit configured blocklists")]
#[command(version)]
struct Args {
    /// Initial global filter words, comma-separated
    #[arg(short, long, env = "WORDFILTER_WORDS")]
    words: Option<String>,

    /// Similarity threshold 0-100 (0 disables approximate matching)
    #[arg(short, long, env = "WORDFILTER_THRESHOLD")]
    threshold: Option<String>,

    /// The bot's own author id; its messages are never filtered
    #[arg(long, env = "WORDFILTER_SELF_ID")]
    self_id: Option<String>,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: Wordfilter bot panicked");
        eprintln!(
            "  Location: {}",
            panic_info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
        eprintln!(
            "  Message: {}",
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .unwrap_or(&"<no message>")
        );
    }));

    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the event protocol, so logs must stay on stderr
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("Initializing Wordfilter Bot");
    info!("  Version: {}", env!("CARGO_PKG_VERSION"));

    let config = BotConfig::from_raw(
        args.words.as_deref(),
        args.threshold.as_deref(),
        args.self_id.as_deref(),
    )?;
    let state = Arc::new(config.build_state());

    info!(
        words = config.initial_words.len(),
        threshold = config.threshold.get(),
        fingerprint = %state.fingerprint(),
        "Filter state ready"
    );
    if config.initial_words.is_empty() {
        info!("No initial filter words set");
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    // A shutdown signal stops reading; in-flight deletions are still written
    let (_, summary) =
        runtime::run_until(stdin, stdout, state, config.self_id, shutdown_signal()).await?;
    info!(
        deleted = summary.pipeline.messages_deleted,
        failures = summary.pipeline.delete_failures,
        "Input closed"
    );

    info!("Wordfilter bot shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
