//! Length-prefixed framing and JSON envelope of the versioned
//! protocol generation.
//!
//! Every message on the wire is an 8-byte header — request id and
//! content length, both little-endian `u32` — followed by the
//! (ciphered) JSON payload.

use serde::{Deserialize, Serialize};

pub(crate) const HEADER_LENGTH: usize = 8;

/// Envelope version spoken by this client.
pub(crate) const PROTOCOL_VERSION: u32 = 2;

/// Payloads beyond this are a protocol violation, not a real frame.
pub(crate) const MAX_CONTENT_LENGTH: u32 = 8 * 1024 * 1024;

/// The fixed per-message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub request_id: u32,
    pub content_length: u32,
}

impl FrameHeader {
    pub(crate) fn to_bytes(self) -> [u8; HEADER_LENGTH] {
        let mut bytes = [0u8; HEADER_LENGTH];
        bytes[0..4].copy_from_slice(&self.request_id.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.content_length.to_le_bytes());
        bytes
    }

    pub(crate) fn from_bytes(bytes: [u8; HEADER_LENGTH]) -> Self {
        Self {
            request_id: u32::from_le_bytes(bytes[0..4].try_into().expect("4 header bytes")),
            content_length: u32::from_le_bytes(bytes[4..8].try_into().expect("4 header bytes")),
        }
    }
}

/// Request envelope. `content_body` is null for the key exchange, the
/// bare string for string-typed commands, and a JSON-encoded string
/// for everything else (the nested encoding the server expects).
#[derive(Debug, Serialize)]
pub(crate) struct RawRequest<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "AuthToken")]
    pub auth_token: &'a str,
    #[serde(rename = "ContentBody")]
    pub content_body: serde_json::Value,
    #[serde(rename = "Version")]
    pub version: u32,
}

/// Response envelope. `content_body` is nested JSON except for the
/// key exchange, where it is base64-encoded raw bytes.
#[derive(Debug, Deserialize)]
pub(crate) struct RawResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "statusMessage", default)]
    pub status_message: String,
    #[serde(rename = "version", default)]
    pub version: u32,
    #[serde(rename = "name", default)]
    pub name: String,
    #[serde(rename = "contentBody", default)]
    pub content_body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FrameHeader {
            request_id: 7,
            content_length: 0x0102_0304,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[7, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[4, 3, 2, 1]);
        assert_eq!(FrameHeader::from_bytes(bytes), header);
    }

    #[test]
    fn request_envelope_keys() {
        let req = RawRequest {
            name: "Login",
            auth_token: "",
            content_body: serde_json::Value::String("hunter2".into()),
            version: PROTOCOL_VERSION,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["Name"], "Login");
        assert_eq!(json["AuthToken"], "");
        assert_eq!(json["ContentBody"], "hunter2");
        assert_eq!(json["Version"], 2);
    }

    #[test]
    fn response_envelope_keys() {
        let res: RawResponse = serde_json::from_str(
            r#"{"statusCode":200,"statusMessage":"OK","version":2,"name":"Login","contentBody":"token"}"#,
        )
        .unwrap();
        assert_eq!(res.status_code, 200);
        assert_eq!(res.status_message, "OK");
        assert_eq!(res.version, 2);
        assert_eq!(res.name, "Login");
        assert_eq!(res.content_body, "token");
    }

    #[test]
    fn response_envelope_tolerates_missing_fields() {
        let res: RawResponse = serde_json::from_str(r#"{"statusCode":401}"#).unwrap();
        assert_eq!(res.status_code, 401);
        assert!(res.content_body.is_empty());
    }
}
