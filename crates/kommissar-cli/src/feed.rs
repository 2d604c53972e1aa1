//! Line-oriented event feed.
//!
//! The reader decodes one JSON document per line and hands events to the
//! ingest loop over a bounded channel. Undecodable lines are logged and
//! skipped.

use std::future::Future;
use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use kommissar_types::{Event, EventError};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Line format of an event feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// Watch envelopes: `{"type":"ADDED","object":{...}}`.
    #[default]
    Watch,
    /// Bare resource objects.
    Object,
}

impl FeedFormat {
    /// Decodes one line, stamping it with the current time.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Decode` if the line is not valid for this format.
    pub fn decode(self, line: &str) -> Result<Event, EventError> {
        match self {
            Self::Watch => Event::from_watch_json(line, Utc::now()),
            Self::Object => Event::from_object_json(line, Utc::now()),
        }
    }
}

impl std::str::FromStr for FeedFormat {
    type Err = ParseFeedFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watch" => Ok(Self::Watch),
            "object" => Ok(Self::Object),
            _ => Err(ParseFeedFormatError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown feed format string.
#[derive(Debug, Clone)]
pub struct ParseFeedFormatError(pub String);

impl std::fmt::Display for ParseFeedFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown feed format: {}", self.0)
    }
}

impl std::error::Error for ParseFeedFormatError {}

/// Decodes one raw feed line, logging and returning `None` for blank or
/// undecodable lines. `decode_failures` counts the latter.
fn decode_line(
    format: FeedFormat,
    line_no: u64,
    line: &str,
    decode_failures: &AtomicU64,
) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match format.decode(line) {
        Ok(event) => Some(event),
        Err(e) => {
            decode_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(line_no, error = %e, "skipping undecodable event");
            None
        }
    }
}

/// Reads `reader` to the end, or until `shutdown` resolves, sending decoded
/// events to `tx`.
///
/// Returns the number of lines that failed to decode.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub async fn read_feed<R, S>(
    reader: R,
    format: FeedFormat,
    tx: mpsc::Sender<Event>,
    shutdown: S,
) -> Result<u64, std::io::Error>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let decode_failures = AtomicU64::new(0);
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            () = &mut shutdown => {
                tracing::info!(line_no, "feed interrupted");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::debug!(line_no, "feed exhausted");
            break;
        };
        line_no += 1;

        let Some(event) = decode_line(format, line_no, &line, &decode_failures) else {
            continue;
        };
        if tx.send(event).await.is_err() {
            tracing::warn!(line_no, "ingest loop closed, stopping feed");
            break;
        }
    }

    Ok(decode_failures.into_inner())
}

/// Blocking counterpart of [`read_feed`] for readers that cannot be
/// cancelled, such as stdin. Meant to run on its own thread.
///
/// Stops at end of input or once the receiving side of `tx` is gone.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub fn read_feed_blocking<R>(
    reader: R,
    format: FeedFormat,
    tx: mpsc::Sender<Event>,
    decode_failures: &AtomicU64,
) -> Result<(), std::io::Error>
where
    R: BufRead,
{
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line = line?;

        let Some(event) = decode_line(format, line_no, &line, decode_failures) else {
            continue;
        };
        if tx.blocking_send(event).is_err() {
            tracing::debug!(line_no, "ingest loop closed, stopping feed");
            return Ok(());
        }
    }

    tracing::debug!("feed exhausted");
    Ok(())
}
