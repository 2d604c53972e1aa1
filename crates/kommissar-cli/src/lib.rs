//! The kommissar command line front end.
//!
//! Reads a feed of watch events, classifies each into a [`SharedTree`], and
//! reports what was indexed. Ingestion errors never abort the run: the
//! offending event is logged and counted as skipped.

pub mod config;
pub mod feed;

use std::future::Future;
use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kommissar_index::{IndexError, SharedTree};
use kommissar_types::Event;
use tokio::io::AsyncBufRead;
use tokio::sync::{mpsc, oneshot};

use crate::feed::{read_feed, read_feed_blocking, FeedFormat};

/// Errors that end a run early.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Reading the feed, or starting its reader thread, failed.
    #[error("feed read error: {0}")]
    Io(#[from] std::io::Error),

    /// The feed task panicked or was cancelled.
    #[error("feed task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The tree could not be read after ingestion.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Events attached to the tree.
    pub ingested: u64,
    /// Decoded events the tree rejected.
    pub skipped: u64,
    /// Bookmark and error watch events, which carry no resource.
    pub ignored: u64,
    /// Lines that could not be decoded.
    pub decode_failures: u64,
    /// Nodes in the tree afterwards, root included.
    pub nodes: usize,
    /// Resource-version leaves in the tree afterwards.
    pub leaves: usize,
}

#[derive(Debug, Default)]
struct LoopCounts {
    ingested: u64,
    skipped: u64,
    ignored: u64,
    interrupted: bool,
}

/// Drains `rx` into `tree`, one event at a time, until the channel closes or
/// `shutdown` resolves.
async fn ingest_loop<S>(
    tree: &SharedTree,
    mut rx: mpsc::Receiver<Event>,
    shutdown: S,
) -> LoopCounts
where
    S: Future<Output = ()>,
{
    let mut counts = LoopCounts::default();
    tokio::pin!(shutdown);

    loop {
        let event = tokio::select! {
            () = &mut shutdown => {
                tracing::info!("ingest interrupted");
                counts.interrupted = true;
                break;
            }
            event = rx.recv() => event,
        };
        let Some(event) = event else {
            break;
        };

        if let Some(change) = event.change.filter(|c| !c.is_resource()) {
            counts.ignored += 1;
            tracing::debug!(
                %change,
                rv = %event.resource_version,
                "ignoring non-resource watch event"
            );
            continue;
        }

        let kind = event.kind.clone();
        let name = event.name.clone();
        match tree.ingest(event) {
            Ok(outcome) => {
                counts.ingested += 1;
                if outcome.created > 0 {
                    tracing::debug!(
                        kind = %kind,
                        name = %name,
                        created = outcome.created,
                        "indexed new resource version"
                    );
                }
            }
            Err(e) => {
                counts.skipped += 1;
                tracing::warn!(kind = %kind, name = %name, error = %e, "skipping event");
            }
        }
    }

    counts
}

fn summarize(
    tree: &SharedTree,
    counts: LoopCounts,
    decode_failures: u64,
) -> Result<IngestSummary, CliError> {
    let (nodes, leaves) = tree.read(|t| (t.len(), t.leaf_count()))?;
    Ok(IngestSummary {
        ingested: counts.ingested,
        skipped: counts.skipped,
        ignored: counts.ignored,
        decode_failures,
        nodes,
        leaves,
    })
}

/// Reads `reader` into `tree` until the feed ends or `shutdown` resolves.
///
/// The reader runs as its own task; this task is the single writer.
///
/// # Errors
///
/// Returns `CliError` if the feed cannot be read or the tree lock is poisoned.
pub async fn run<R, S>(
    tree: &SharedTree,
    reader: R,
    format: FeedFormat,
    channel_capacity: usize,
    shutdown: S,
) -> Result<IngestSummary, CliError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    S: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let feed = tokio::spawn(read_feed(reader, format, tx, shutdown));

    let counts = ingest_loop(tree, rx, std::future::pending()).await;
    let decode_failures = feed.await??;
    summarize(tree, counts, decode_failures)
}

/// Like [`run`], for a blocking reader such as stdin.
///
/// The reader runs on a dedicated thread. On shutdown this returns without
/// waiting for it, since a blocked read cannot be cancelled; the thread ends
/// with the process.
///
/// # Errors
///
/// Returns `CliError` if the reader thread cannot start, reading fails, or
/// the tree lock is poisoned.
pub async fn run_blocking<R, S>(
    tree: &SharedTree,
    reader: R,
    format: FeedFormat,
    channel_capacity: usize,
    shutdown: S,
) -> Result<IngestSummary, CliError>
where
    R: BufRead + Send + 'static,
    S: Future<Output = ()>,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let (done_tx, done_rx) = oneshot::channel();
    let decode_failures = Arc::new(AtomicU64::new(0));

    let thread_failures = Arc::clone(&decode_failures);
    std::thread::Builder::new()
        .name("kommissar-feed".to_string())
        .spawn(move || {
            let result = read_feed_blocking(reader, format, tx, &thread_failures);
            let _ = done_tx.send(result);
        })?;

    let counts = ingest_loop(tree, rx, shutdown).await;
    if !counts.interrupted {
        // The channel closed, so the reader thread has finished.
        if let Ok(result) = done_rx.await {
            result?;
        }
    }
    summarize(tree, counts, decode_failures.load(Ordering::Relaxed))
}
