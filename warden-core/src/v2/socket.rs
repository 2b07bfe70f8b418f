//! Versioned-generation socket: length-prefixed frames, JSON
//! envelopes, and the greet → login handshake.
//!
//! A fresh session sends exactly two pre-auth requests:
//! `ServerConnect` (plaintext, returns the base64 XOR key) and
//! `Login` (ciphered, returns the auth token). Every later request
//! carries the token.

use std::io;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::BytesMut;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::commands::Command;
use super::framing::{
    FrameHeader, RawRequest, RawResponse, HEADER_LENGTH, MAX_CONTENT_LENGTH, PROTOCOL_VERSION,
};
use crate::cipher::XorCipher;
use crate::deadline::{io_timeout_at, Deadline};
use crate::error::RconError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RECONNECTS: u32 = 3;

/// One authenticated versioned session. Not safe for concurrent
/// callers; the pool guarantees exclusive use.
pub(crate) struct Socket {
    stream: TcpStream,
    cipher: XorCipher,
    password: String,
    host: String,
    port: u16,
    reconnects: u32,
    /// Monotonically non-decreasing within one session; resets to
    /// zero on reconnect.
    next_request_id: u32,
    auth_token: String,
    deadline: Deadline,
}

impl Socket {
    /// Connect and run the full handshake.
    pub(crate) async fn open(
        host: impl Into<String>,
        port: u16,
        password: impl Into<String>,
    ) -> Result<Self, RconError> {
        let host = host.into();
        let stream = Self::dial(&host, port).await?;
        let mut socket = Self {
            stream,
            cipher: XorCipher::empty(),
            password: password.into(),
            host,
            port,
            reconnects: 0,
            next_request_id: 0,
            auth_token: String::new(),
            deadline: Deadline::none(),
        };
        socket.greet().await?;
        socket.login().await?;
        Ok(socket)
    }

    async fn dial(host: &str, port: u16) -> Result<TcpStream, RconError> {
        Ok(io_timeout_at(
            tokio::time::Instant::now() + CONNECT_TIMEOUT,
            TcpStream::connect((host, port)),
        )
        .await?)
    }

    pub(crate) fn set_deadline(&mut self, deadline: Deadline) {
        self.deadline = deadline;
    }

    /// The token issued by the last successful login.
    pub(crate) fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// `ServerConnect`: the one frame sent without a cipher. The
    /// response body is the session's XOR key, base64-encoded.
    async fn greet(&mut self) -> Result<(), RconError> {
        let req = RawRequest {
            name: "ServerConnect",
            auth_token: "",
            content_body: serde_json::Value::Null,
            version: PROTOCOL_VERSION,
        };
        self.send_frame(&serde_json::to_vec(&req)?).await?;
        let res = self.read_envelope().await?;
        if res.status_code != 200 {
            return Err(RconError::UnexpectedStatus {
                code: res.status_code,
                message: res.status_message,
            });
        }
        let key = BASE64.decode(res.content_body.as_bytes())?;
        self.cipher.set_key(key);
        Ok(())
    }

    /// `Login`: body is the password; the response body is the auth
    /// token used by every subsequent request.
    async fn login(&mut self) -> Result<(), RconError> {
        let req = RawRequest {
            name: "Login",
            auth_token: "",
            content_body: serde_json::Value::String(self.password.clone()),
            version: PROTOCOL_VERSION,
        };
        self.send_frame(&serde_json::to_vec(&req)?).await?;
        let res = self.read_envelope().await?;
        match res.status_code {
            200 => {
                self.auth_token = res.content_body;
                Ok(())
            }
            401 => Err(RconError::InvalidCredentials),
            code => Err(RconError::UnexpectedStatus {
                code,
                message: res.status_message,
            }),
        }
    }

    /// Issue a typed command and return the raw response envelope.
    /// Reconnects through a broken pipe, re-running the handshake and
    /// re-encoding with the fresh token.
    pub(crate) async fn request<T: Command>(&mut self, body: &T) -> Result<RawResponse, RconError> {
        body.validate()?;
        let payload = encode_request(body, &self.auth_token)?;
        match self.send_frame(&payload).await {
            Ok(()) => {}
            Err(RconError::Connection(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                self.reconnect(e).await?;
                let payload = encode_request(body, &self.auth_token)?;
                self.send_frame(&payload).await?;
            }
            Err(e) => return Err(e),
        }
        self.reconnects = 0;
        self.read_envelope().await
    }

    /// Write one header-plus-payload frame and advance the request id.
    async fn send_frame(&mut self, payload: &[u8]) -> Result<(), RconError> {
        let data = self.cipher.apply(payload);
        let header = FrameHeader {
            request_id: self.next_request_id,
            content_length: data.len() as u32,
        };
        let mut frame = BytesMut::with_capacity(HEADER_LENGTH + data.len());
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(&data);
        let at = self.deadline.io_at();
        io_timeout_at(at, self.stream.write_all(&frame)).await?;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        Ok(())
    }

    /// Read exactly one frame and parse the JSON envelope.
    async fn read_envelope(&mut self) -> Result<RawResponse, RconError> {
        let mut header = [0u8; HEADER_LENGTH];
        let at = self.deadline.io_at();
        io_timeout_at(at, self.stream.read_exact(&mut header)).await?;
        let header = FrameHeader::from_bytes(header);
        if header.content_length > MAX_CONTENT_LENGTH {
            return Err(RconError::ProtocolViolation("content length exceeds frame cap"));
        }
        let mut payload = vec![0u8; header.content_length as usize];
        let at = self.deadline.io_at();
        io_timeout_at(at, self.stream.read_exact(&mut payload)).await?;
        let plain = self.cipher.apply(&payload);
        Ok(serde_json::from_slice(&plain)?)
    }

    /// Fresh TCP, fresh key, fresh token. Request ids restart at
    /// zero. Capped at [`MAX_RECONNECTS`] consecutive failures.
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
            "reconnecting versioned session"
        );
        self.stream = Self::dial(&self.host, self.port).await?;
        self.cipher = XorCipher::empty();
        self.next_request_id = 0;
        self.auth_token.clear();
        self.greet().await?;
        self.login().await
    }
}

/// Build the ciphered-ready JSON payload for a typed body. A body
/// that serializes to a bare string goes into the envelope verbatim;
/// everything else is nested: the body's JSON as a string value.
fn encode_request<T: Command>(body: &T, auth_token: &str) -> Result<Vec<u8>, RconError> {
    let content_body = match serde_json::to_value(body)? {
        serde_json::Value::String(s) => serde_json::Value::String(s),
        other => serde_json::Value::String(other.to_string()),
    };
    let req = RawRequest {
        name: T::NAME,
        auth_token,
        content_body,
        version: PROTOCOL_VERSION,
    };
    Ok(serde_json::to_vec(&req)?)
}

/// Decode a nested-JSON response body.
pub(crate) fn decode_body<U: DeserializeOwned>(res: &RawResponse) -> Result<U, RconError> {
    Ok(serde_json::from_str(&res.content_body)?)
}
