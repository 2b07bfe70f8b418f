//! Domain-specific error types for the RCon client.
//!
//! All fallible operations return `Result<T, RconError>`.
//! No panics on server-controlled input — every error is typed and
//! recoverable where the protocol allows recovery.

use thiserror::Error;

/// The canonical error type for the RCon client.
#[derive(Debug, Error)]
pub enum RconError {
    // ── Session Errors ───────────────────────────────────────────
    /// The server rejected the configured password.
    ///
    /// Fatal to the session: reconnecting re-authenticates with the
    /// same password and will fail the same way.
    #[error("server rejected the configured password")]
    InvalidCredentials,

    /// The server answered a non-login command with `FAIL` (legacy
    /// generation). Non-fatal; surfaced per call.
    #[error("command rejected by server")]
    CommandFailed,

    /// A versioned-protocol response carried a status other than 200
    /// (and other than 401 during login).
    #[error("unexpected status {code}: {message}")]
    UnexpectedStatus { code: u16, message: String },

    // ── Transport Errors ─────────────────────────────────────────
    /// The TCP/IO layer reported an error. Deadline expiry surfaces
    /// here as `io::ErrorKind::TimedOut`.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The cap of consecutive failed reconnects was exceeded.
    #[error("there are no reconnects left")]
    ReconnectTriesExceeded,

    // ── Pool Errors ──────────────────────────────────────────────
    /// No connection became available before the caller's deadline.
    #[error("connection request timed out before a connection was available")]
    PoolTimeout,

    /// The pool was shut down while the request was outstanding.
    #[error("connection pool is shut down")]
    PoolClosed,

    // ── Protocol Errors ──────────────────────────────────────────
    /// A frame or payload violated protocol rules. The socket is
    /// suspect afterwards and should be discarded, not re-idled.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// A list response did not start with a decimal element count.
    #[error("expected a decimal list count, got {0:?}")]
    BadListCount(String),

    /// A command body is missing a field the server requires.
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    /// A log line did not carry a parsable bracketed timestamp.
    #[error("unparsable log line: {0}")]
    UnparsableLogLine(String),

    // ── Encoding Errors ──────────────────────────────────────────
    /// JSON encoding or decoding of an envelope or body failed.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A textual response was not valid UTF-8.
    #[error("invalid utf-8 in response: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The handshake key was not valid base64.
    #[error("invalid key encoding: {0}")]
    KeyEncoding(#[from] base64::DecodeError),
}

impl RconError {
    /// Whether this error means the underlying session is gone and a
    /// fresh socket is needed: reconnect budget exhausted, or the
    /// transport reporting a torn connection.
    ///
    /// The log loop keeps polling through these; everything else
    /// stops it.
    pub fn is_broken_connection(&self) -> bool {
        match self {
            RconError::ReconnectTriesExceeded => true,
            RconError::Connection(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Whether this error is an elapsed I/O deadline. The open-ended
    /// log read uses this to detect end-of-response.
    pub fn is_io_timeout(&self) -> bool {
        matches!(self, RconError::Connection(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }
}
