//! Periodic admin-log polling: pull, parse, deduplicate, deliver.
//!
//! The loop borrows one pooled connection per fetch and releases it
//! between fetches, so command traffic and log polling share the same
//! pool without starving each other.

mod data;
mod parser;

pub use data::{LogAction, LogEvent, MatchResult, PlayerRef};
pub use parser::parse_log_line;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::deadline::Deadline;
use crate::pool::ConnectionPool;
use crate::v1::Connection;

/// Tuning for a [`LogLoop`].
#[derive(Debug, Clone, Copy)]
pub struct LogLoopOptions {
    /// Window of the very first fetch, to catch up on history.
    pub initial_window: Duration,
    /// Window of every later fetch.
    pub follow_window: Duration,
    /// Pause between fetches.
    pub poll_interval: Duration,
}

impl Default for LogLoopOptions {
    fn default() -> Self {
        Self {
            initial_window: Duration::from_secs(60 * 60),
            follow_window: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Continuously pulls recent log entries and forwards new ones in
/// batches to a callback.
pub struct LogLoop {
    pool: ConnectionPool<Connection>,
    options: LogLoopOptions,
    token: CancellationToken,
}

impl LogLoop {
    pub fn new(pool: ConnectionPool<Connection>) -> Self {
        Self::with_options(pool, LogLoopOptions::default())
    }

    pub fn with_options(pool: ConnectionPool<Connection>, options: LogLoopOptions) -> Self {
        Self {
            pool,
            options,
            token: CancellationToken::new(),
        }
    }

    /// A token that stops the loop from outside the callback.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run until the callback returns `true`, the token fires, or an
    /// error other than a broken connection surfaces.
    ///
    /// Batches are deduplicated by event time: only lines strictly
    /// newer than the last emitted timestamp are delivered, so
    /// overlapping fetch windows do not repeat events. Broken
    /// connections are logged and polled through — the next fetch
    /// acquires a healthy socket from the pool.
    pub async fn run<F>(&self, mut on_batch: F) -> Result<(), crate::error::RconError>
    where
        F: FnMut(Vec<LogEvent>) -> bool + Send,
    {
        let mut last_seen: Option<DateTime<Utc>> = None;
        let mut window = self.options.initial_window;

        loop {
            if self.token.is_cancelled() {
                return Ok(());
            }

            let fetch = self
                .pool
                .with_connection(Deadline::none(), |mut conn| async move {
                    conn.show_log(window).await
                })
                .await;

            match fetch {
                Ok(lines) => {
                    window = self.options.follow_window;
                    let batch = collect_new(&lines, &mut last_seen);
                    if !batch.is_empty() && on_batch(batch) {
                        return Ok(());
                    }
                }
                Err(e) if e.is_broken_connection() => {
                    error!(error = %e, "log fetch failed on a broken connection; retrying");
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = self.token.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }
    }
}

/// Parse raw lines and keep the ones newer than `last_seen`, advancing
/// it to the tail of what gets emitted.
fn collect_new(lines: &[String], last_seen: &mut Option<DateTime<Utc>>) -> Vec<LogEvent> {
    let mut batch = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_empty() {
            continue;
        }
        match parse_log_line(line) {
            Ok(event) => {
                if last_seen.map_or(true, |seen| event.timestamp > seen) {
                    batch.push(event);
                }
            }
            Err(e) => warn!(error = %e, "dropping unparsable log line"),
        }
    }
    if let Some(tail) = batch.last() {
        *last_seen = Some(tail.timestamp);
    }
    batch
}
