//! Legacy-generation socket: TCP plus the XOR key pushed by the
//! server on connect.
//!
//! The legacy protocol has no length framing. A response is one or
//! more reads of up to [`FRAME_LEN`] bytes; a short read marks the
//! end of a frame, and completeness beyond that is the caller's
//! problem (see the list-command and log-read heuristics).

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::cipher::XorCipher;
use crate::deadline::{io_timeout_at, Deadline};
use crate::error::RconError;

/// Maximum frame size; also the size of the key frame the server
/// pushes right after accept (zero-padded).
pub(crate) const FRAME_LEN: usize = 8196;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RECONNECTS: u32 = 3;

/// One authenticated legacy session. Not safe for concurrent callers;
/// the pool guarantees exclusive use.
pub(crate) struct Socket {
    stream: TcpStream,
    cipher: XorCipher,
    password: String,
    host: String,
    port: u16,
    reconnects: u32,
    deadline: Deadline,
}

impl Socket {
    /// Connect, receive the key frame, and log in.
    pub(crate) async fn open(
        host: impl Into<String>,
        port: u16,
        password: impl Into<String>,
    ) -> Result<Self, RconError> {
        let host = host.into();
        let (stream, cipher) = Self::dial(&host, port).await?;
        let mut socket = Self {
            stream,
            cipher,
            password: password.into(),
            host,
            port,
            reconnects: 0,
            deadline: Deadline::none(),
        };
        socket.login().await?;
        Ok(socket)
    }

    /// Establish TCP and consume the key frame the server pushes
    /// immediately after accepting. Trailing zero padding is not part
    /// of the key.
    async fn dial(host: &str, port: u16) -> Result<(TcpStream, XorCipher), RconError> {
        let mut stream = io_timeout_at(
            tokio::time::Instant::now() + CONNECT_TIMEOUT,
            TcpStream::connect((host, port)),
        )
        .await?;

        let mut key = vec![0u8; FRAME_LEN];
        let n = io_timeout_at(Deadline::none().io_at(), stream.read(&mut key)).await?;
        key.truncate(n);
        while key.last() == Some(&0) {
            key.pop();
        }
        Ok((stream, XorCipher::new(key)))
    }

    pub(crate) fn set_deadline(&mut self, deadline: Deadline) {
        self.deadline = deadline;
    }

    pub(crate) fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Authenticate with the configured password. A `FAIL` here is a
    /// credentials problem, not a command rejection.
    async fn login(&mut self) -> Result<(), RconError> {
        let login = self.cipher.apply(format!("login {}", self.password).as_bytes());
        io_timeout_at(self.deadline.io_at(), self.stream.write_all(&login)).await?;
        let reply = self.read_plain().await?;
        if reply == b"FAIL" {
            return Err(RconError::InvalidCredentials);
        }
        Ok(())
    }

    /// Execute a command expecting a single textual reply.
    pub(crate) async fn command(&mut self, cmd: &str) -> Result<String, RconError> {
        self.write(cmd).await?;
        let reply = String::from_utf8(self.read().await?)?;
        if reply == "FAIL" {
            return Err(RconError::CommandFailed);
        }
        Ok(reply)
    }

    /// Execute a command whose reply is a tab-separated list.
    ///
    /// The first field is a decimal count of the remaining elements.
    /// The count is a lower bound: reading continues until at least
    /// `count + 1` tabs arrived, or until the count is satisfied and
    /// the stream goes quiet. The count field and empty trailing
    /// fields are stripped.
    pub(crate) async fn list_command(&mut self, cmd: &str) -> Result<Vec<String>, RconError> {
        self.write(cmd).await?;
        let mut text = String::from_utf8(self.read().await?)?;

        let first = text.split('\t').next().unwrap_or_default();
        let count: usize = first
            .trim()
            .parse()
            .map_err(|_| RconError::BadListCount(first.to_string()))?;

        while text.matches('\t').count() < count + 1 {
            match self.read().await {
                Ok(more) => text.push_str(&String::from_utf8(more)?),
                // Quiet stream with the promised elements on hand:
                // the count included the trailing empty token.
                Err(e) if e.is_io_timeout() && text.matches('\t').count() >= count => break,
                Err(e) => return Err(e),
            }
        }

        Ok(text
            .split('\t')
            .skip(1)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Write one ciphered command, reconnecting through a broken pipe.
    pub(crate) async fn write(&mut self, cmd: &str) -> Result<(), RconError> {
        let frame = self.cipher.apply(cmd.as_bytes());
        match io_timeout_at(self.deadline.io_at(), self.stream.write_all(&frame)).await {
            Ok(()) => {
                self.reconnects = 0;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                self.reconnect(e).await?;
                // The reconnect negotiated a fresh key.
                let frame = self.cipher.apply(cmd.as_bytes());
                io_timeout_at(self.deadline.io_at(), self.stream.write_all(&frame)).await?;
                self.reconnects = 0;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read one deciphered response, reconnecting through a reset.
    ///
    /// Frames of exactly [`FRAME_LEN`] bytes are followed by another
    /// read; a shorter frame ends the response.
    pub(crate) async fn read(&mut self) -> Result<Vec<u8>, RconError> {
        let mut answer = Vec::new();
        loop {
            let chunk = match self.read_chunk().await {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                    self.reconnect(e).await?;
                    self.read_chunk().await?
                }
                Err(e) => return Err(e.into()),
            };
            self.reconnects = 0;
            answer.extend_from_slice(&self.cipher.apply(&chunk));
            if chunk.len() >= FRAME_LEN {
                continue;
            }
            break;
        }
        Ok(answer)
    }

    /// Like [`read`], but without the reconnect path. Used during
    /// login, where a reconnect would recurse into login again.
    async fn read_plain(&mut self) -> Result<Vec<u8>, RconError> {
        let chunk = self.read_chunk().await?;
        Ok(self.cipher.apply(&chunk))
    }

    async fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; FRAME_LEN];
        let at = self.deadline.io_at();
        let n = io_timeout_at(at, self.stream.read(&mut buf)).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.truncate(n);
        Ok(buf)
    }

    /// Tear the session down and build it back up: fresh TCP, fresh
    /// key, fresh login. Capped at [`MAX_RECONNECTS`] consecutive
    /// failures; any successful read or write resets the budget.
    async fn reconnect(&mut self, cause: io::Error) -> Result<(), RconError> {
        if self.reconnects >= MAX_RECONNECTS {
            return Err(RconError::ReconnectTriesExceeded);
        }
        self.reconnects += 1;
        tracing::debug!(
            host = %self.host,
            port = self.port,
            attempt = self.reconnects,
            cause = %cause,
            "reconnecting legacy session"
        );
        let (stream, cipher) = Self::dial(&self.host, self.port).await?;
        self.stream = stream;
        self.cipher = cipher;
        self.login().await
    }
}
