//! Application-level handshake layered on a freshly connected transport.
//!
//! ```text
//! client                         server
//!   │ ── [handshakeEvent, payload] ─► │
//!   │ ◄── [ackEvent, {"status":..}] ─ │   status == success ⇒ Ready
//! ```

use crate::error::ProtocolError;
use crate::frame::Frame;
use serde_json::Value;

const STATUS_KEY: &str = "status";

/// The handshake frame to send once the transport reports connected.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeRequest {
    event: String,
    payload: Value,
}

impl HandshakeRequest {
    /// Parses the configured payload text; any JSON value is accepted.
    pub fn new(event: &str, payload_json: &str) -> Result<Self, ProtocolError> {
        let payload = serde_json::from_str(payload_json)
            .map_err(|e| ProtocolError::HandshakeEncoding(e.to_string()))?;
        Ok(Self {
            event: event.to_string(),
            payload,
        })
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn into_frame(self) -> Frame {
        Frame::new(self.event, self.payload)
    }
}

/// Outcome of inspecting a handshake ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckVerdict {
    Accepted,
    /// `status` is what the ack carried, `None` when missing or not a string.
    Rejected { status: Option<String> },
}

/// Judges an ack payload against the configured success status.
///
/// A missing payload, a non-object payload, a missing `status` or a
/// non-string `status` all count as a non-matching status.
pub fn evaluate_ack(payload: Option<&Value>, success_status: &str) -> AckVerdict {
    let status = payload
        .and_then(|p| p.get(STATUS_KEY))
        .and_then(Value::as_str);

    match status {
        Some(status) if status == success_status => AckVerdict::Accepted,
        other => AckVerdict::Rejected {
            status: other.map(str::to_string),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_frame_from_configured_payload() {
        let request = HandshakeRequest::new("handshake", r#"{"type":"manager","version":"1.0.0"}"#)
            .unwrap();
        assert_eq!(request.event(), "handshake");
        assert_eq!(
            request.into_frame().encode().unwrap(),
            r#"["handshake",{"type":"manager","version":"1.0.0"}]"#
        );
    }

    #[test]
    fn invalid_payload_is_an_encoding_error() {
        assert!(matches!(
            HandshakeRequest::new("handshake", "{type: manager"),
            Err(ProtocolError::HandshakeEncoding(_))
        ));
    }

    #[test]
    fn exact_status_is_accepted() {
        assert_eq!(
            evaluate_ack(Some(&json!({"status": "accepted"})), "accepted"),
            AckVerdict::Accepted
        );
    }

    #[test]
    fn other_statuses_are_rejected() {
        assert_eq!(
            evaluate_ack(Some(&json!({"status": "Accepted"})), "accepted"),
            AckVerdict::Rejected {
                status: Some("Accepted".into())
            }
        );
        assert_eq!(
            evaluate_ack(Some(&json!({"status": "denied", "reason": "bad token"})), "accepted"),
            AckVerdict::Rejected {
                status: Some("denied".into())
            }
        );
    }

    #[test]
    fn malformed_acks_are_rejected_without_status() {
        let none = AckVerdict::Rejected { status: None };
        assert_eq!(evaluate_ack(None, "accepted"), none);
        assert_eq!(evaluate_ack(Some(&json!({})), "accepted"), none);
        assert_eq!(evaluate_ack(Some(&json!("accepted")), "accepted"), none);
        assert_eq!(evaluate_ack(Some(&json!({"status": 1})), "1"), none);
        assert_eq!(evaluate_ack(Some(&json!([{"status": "accepted"}])), "accepted"), none);
    }
}
