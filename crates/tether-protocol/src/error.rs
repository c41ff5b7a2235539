use thiserror::Error;

/// Errors raised while encoding or decoding event frames and handshake payloads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Failed to decode event frame: {reason} - Frame fragment: '{frame_fragment}'")]
    FrameDecode {
        reason: String,
        frame_fragment: String, // Include part of the problematic frame
    },

    #[error("Failed to encode event '{event}': {reason}")]
    Encode { event: String, reason: String },

    /// The configured handshake payload is not valid JSON.
    #[error("Handshake payload is not valid JSON: {0}")]
    HandshakeEncoding(String),
}

const FRAGMENT_LEN: usize = 120;

impl ProtocolError {
    pub(crate) fn frame_decode(reason: impl Into<String>, raw: &str) -> Self {
        let frame_fragment = match raw.char_indices().nth(FRAGMENT_LEN) {
            Some((cut, _)) => format!("{}...", &raw[..cut]),
            None => raw.to_string(),
        };
        ProtocolError::FrameDecode {
            reason: reason.into(),
            frame_fragment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_frames_are_truncated_in_errors() {
        let raw = "x".repeat(500);
        match ProtocolError::frame_decode("bad", &raw) {
            ProtocolError::FrameDecode { frame_fragment, .. } => {
                assert_eq!(frame_fragment.len(), FRAGMENT_LEN + 3);
                assert!(frame_fragment.ends_with("..."));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
