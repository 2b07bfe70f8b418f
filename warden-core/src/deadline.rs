//! Caller-supplied deadlines.
//!
//! Deadlines are explicit values handed to every pool acquisition and
//! carried by each connection for the duration of one loan. There is
//! no ambient or task-local state: absence of a deadline falls back
//! to fixed library defaults.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::time::Instant;

/// Default cap on waiting for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on a single socket I/O operation.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(20);

/// An optional point in time after which an operation gives up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// No caller deadline; library defaults apply.
    pub fn none() -> Self {
        Self { at: None }
    }

    /// Deadline at an absolute instant.
    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    /// Deadline the given duration from now.
    pub fn after(d: Duration) -> Self {
        Self {
            at: Some(Instant::now() + d),
        }
    }

    /// The caller's instant, if one was supplied.
    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    /// Instant bounding a pool wait: the caller's deadline, or 5 s
    /// from now.
    pub(crate) fn acquire_at(&self) -> Instant {
        self.at
            .unwrap_or_else(|| Instant::now() + DEFAULT_ACQUIRE_TIMEOUT)
    }

    /// Instant bounding the next socket I/O operation: the caller's
    /// deadline, or 20 s from now.
    pub(crate) fn io_at(&self) -> Instant {
        self.at.unwrap_or_else(|| Instant::now() + DEFAULT_IO_TIMEOUT)
    }
}

/// Run an I/O future against an absolute deadline. Elapsing maps to
/// `io::ErrorKind::TimedOut` so timeout handling joins the regular
/// transport-error paths.
pub(crate) async fn io_timeout_at<F, T>(at: Instant, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match tokio::time::timeout_at(at, fut).await {
        Ok(res) => res,
        Err(_) => Err(io::Error::from(io::ErrorKind::TimedOut)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_caller_deadline() {
        let d = Deadline::none();
        assert!(d.instant().is_none());
        let now = Instant::now();
        assert!(d.acquire_at() >= now + DEFAULT_ACQUIRE_TIMEOUT - Duration::from_millis(50));
        assert!(d.io_at() >= now + DEFAULT_IO_TIMEOUT - Duration::from_millis(50));
    }

    #[test]
    fn caller_instant_wins() {
        let at = Instant::now() + Duration::from_millis(123);
        let d = Deadline::at(at);
        assert_eq!(d.acquire_at(), at);
        assert_eq!(d.io_at(), at);
    }

    #[tokio::test]
    async fn elapsed_deadline_is_timed_out() {
        let res: io::Result<()> = io_timeout_at(Instant::now(), std::future::pending()).await;
        assert_eq!(res.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn completed_future_passes_through() {
        let res = io_timeout_at(Instant::now() + Duration::from_secs(1), async { Ok(7u8) }).await;
        assert_eq!(res.unwrap(), 7);
    }
}
