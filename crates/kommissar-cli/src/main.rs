//! kommissar binary: index a feed of cluster watch events.
//!
//! Reads newline-delimited watch events from a file or stdin, classifies
//! them into the resource tree, and prints the resulting outline. Ctrl+C
//! stops reading; whatever was ingested so far is still reported.

use kommissar_cli::config::{self, Config};
use kommissar_cli::{run, run_blocking, CliError, IngestSummary};
use kommissar_index::SharedTree;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("KOMMISSAR_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

async fn ingest_feed(config: &Config, tree: &SharedTree) -> Result<IngestSummary, CliError> {
    let format = config.feed.format;
    let capacity = config.feed.channel_capacity;

    match config.feed.path.as_deref() {
        Some(path) => {
            tracing::info!(path, ?format, "reading events from file");
            let file = tokio::fs::File::open(path).await?;
            run(tree, BufReader::new(file), format, capacity, shutdown_signal()).await
        }
        None => {
            tracing::info!(?format, "reading events from stdin");
            let stdin = std::io::BufReader::new(std::io::stdin());
            run_blocking(tree, stdin, format, capacity, shutdown_signal()).await
        }
    }
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("kommissar.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kommissar: failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so the outline on stdout stays clean.
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let tree = SharedTree::new();
    let summary = match ingest_feed(&config, &tree).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "event feed failed");
            std::process::exit(1);
        }
    };

    tracing::info!(
        ingested = summary.ingested,
        skipped = summary.skipped,
        ignored = summary.ignored,
        decode_failures = summary.decode_failures,
        nodes = summary.nodes,
        leaves = summary.leaves,
        "event feed drained"
    );

    if config.output.outline {
        match tree.read(|t| t.render_outline()) {
            Ok(outline) => print!("{outline}"),
            Err(e) => tracing::error!(error = %e, "failed to render outline"),
        }
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, stopping feed"); }
        () = terminate => { tracing::info!("received SIGTERM, stopping feed"); }
    }
}
