//! # Tether Protocol
//!
//! The application-level contract spoken over an already-framed transport:
//! the named-event frame codec, the handshake request/ack exchange and the
//! normalizer that turns every inbound event into one envelope shape.
//!
//! Everything here is pure; sessions in `tether-client` drive it.

pub mod error;
pub mod frame;
pub mod handshake;
pub mod normalize;

pub use error::ProtocolError;
pub use frame::{CONNECT_EVENT, DISCONNECT_EVENT, Frame, is_reserved};
pub use handshake::{AckVerdict, HandshakeRequest, evaluate_ack};
pub use normalize::{Envelope, normalize};

// Re-export Value for convenience
pub use serde_json::Value;
