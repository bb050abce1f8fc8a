//! The response envelope and the two-tier body decoder.
//!
//! Servers that speak the envelope convention return bodies shaped like
//! `{"success": true, "data": {...}, "statusCode": 200, ...}`; plain REST
//! endpoints return the payload bare. The decoder handles both without
//! per-endpoint configuration: it first parses the body as a full envelope
//! and, on shape mismatch, falls back to parsing it as the bare target type
//! wrapped in a synthesized success envelope.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use http::StatusCode;
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// The structured response wrapper returned by every envelope operation.
///
/// Exactly one of "success with usable data" or "failure with message" holds.
/// `status_code` always reflects the transport-observed status (or the 500
/// sentinel for failures that never reached the server); a status code
/// claimed inside the body is never trusted.
///
/// `request_id` and `timestamp` are generated when the envelope is
/// constructed, never taken from the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResponseEnvelope<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Failure description, present on failed envelopes.
    #[serde(default)]
    pub message: Option<String>,
    /// The decoded payload, present on successful envelopes.
    #[serde(default)]
    pub data: Option<T>,
    /// The transport-observed HTTP status code.
    #[serde(default)]
    pub status_code: u16,
    /// Eight lowercase hex characters, unique per envelope.
    #[serde(skip_deserializing, default = "new_request_id")]
    pub request_id: String,
    /// When this envelope was constructed.
    #[serde(skip_deserializing, default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn new_request_id() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

impl<T> ResponseEnvelope<T> {
    /// Builds a successful envelope around decoded data.
    pub fn success(data: T, status_code: u16) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            status_code,
            request_id: new_request_id(),
            timestamp: Utc::now(),
        }
    }

    /// Builds a failed envelope carrying a message and the last observed
    /// status code.
    pub fn failure(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            status_code,
            request_id: new_request_id(),
            timestamp: Utc::now(),
        }
    }
}

/// Decodes a 2xx response body into a typed envelope.
///
/// Tier one parses the body as a full envelope (the required `success` field
/// discriminates) and overwrites its status code with the transport status.
/// Tier two parses the body as bare `T` and synthesizes a success envelope.
/// If both fail the body is malformed for this target type and the attempt
/// fails with [`Error::Decode`].
pub(crate) fn decode_typed<T: DeserializeOwned>(
    body: &[u8],
    status: StatusCode,
) -> Result<ResponseEnvelope<T>> {
    match serde_json::from_slice::<ResponseEnvelope<T>>(body) {
        Ok(mut envelope) => {
            envelope.status_code = status.as_u16();
            Ok(envelope)
        }
        Err(_) => match serde_json::from_slice::<T>(body) {
            Ok(data) => Ok(ResponseEnvelope::success(data, status.as_u16())),
            Err(e) => Err(Error::Decode {
                raw_response: String::from_utf8_lossy(body).into_owned(),
                serde_error: e.to_string(),
                status,
            }),
        },
    }
}

/// Decodes a 2xx response body as raw text, bypassing structured parsing.
pub(crate) fn decode_text(body: &[u8], status: StatusCode) -> ResponseEnvelope<String> {
    ResponseEnvelope::success(String::from_utf8_lossy(body).into_owned(), status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Health {
        ok: bool,
    }

    #[test]
    fn envelope_body_is_parsed_and_status_overwritten() {
        let body = br#"{"success":true,"data":{"ok":true},"statusCode":999}"#;
        let envelope = decode_typed::<Health>(body, StatusCode::OK).unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.data, Some(Health { ok: true }));
        // The wire status is authoritative, not the body's claim.
        assert_eq!(envelope.status_code, 200);
    }

    #[test]
    fn bare_payload_falls_back_to_synthesized_envelope() {
        let body = br#"{"ok":true}"#;
        let envelope = decode_typed::<Health>(body, StatusCode::OK).unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.data, Some(Health { ok: true }));
        assert_eq!(envelope.status_code, 200);
        assert!(envelope.message.is_none());
    }

    #[test]
    fn failed_envelope_from_server_is_preserved() {
        let body = br#"{"success":false,"message":"quota exceeded"}"#;
        let envelope = decode_typed::<Health>(body, StatusCode::OK).unwrap();

        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("quota exceeded"));
        assert_eq!(envelope.status_code, 200);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let body = b"<html>not json</html>";
        let result = decode_typed::<Health>(body, StatusCode::OK);

        match result {
            Err(Error::Decode {
                raw_response,
                status,
                ..
            }) => {
                assert_eq!(raw_response, "<html>not json</html>");
                assert_eq!(status, StatusCode::OK);
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[test]
    fn request_id_is_eight_hex_chars_and_fresh_per_envelope() {
        let a = ResponseEnvelope::<()>::failure("x", 500);
        let b = ResponseEnvelope::<()>::failure("x", 500);

        assert_eq!(a.request_id.len(), 8);
        assert!(a.request_id.chars().all(|c| c.is_ascii_hexdigit()));
        // Two envelopes built back to back get independent ids.
        // (Collisions over a 32-bit space are possible but vanishingly rare.)
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn wire_request_id_is_ignored() {
        let body = br#"{"success":true,"data":{"ok":true},"requestId":"aaaaaaaa"}"#;
        let envelope = decode_typed::<Health>(body, StatusCode::OK).unwrap();
        assert_ne!(envelope.request_id, "aaaaaaaa");
    }

    #[test]
    fn text_mode_bypasses_structured_parsing() {
        let envelope = decode_text(b"plain text, not json", StatusCode::OK);
        assert!(envelope.success);
        assert_eq!(envelope.data.as_deref(), Some("plain text, not json"));
        assert_eq!(envelope.status_code, 200);
    }
}
