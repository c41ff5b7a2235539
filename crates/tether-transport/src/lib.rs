//! # Tether Transport (raw communication)
//!
//! This crate handles the low-level details of establishing and managing
//! network connections (like WebSockets) to the event server.
//!
//! It defines the `Transport` trait for abstracting different communication
//! methods, the `TransportFactory` used to build one transport per
//! connection attempt, and a `tokio-tungstenite` based WebSocket transport.

pub mod error;
pub mod factory;
pub mod traits;
pub mod types;
#[cfg(feature = "websocket")]
pub mod websocket;

// Re-export key items
pub use error::TransportError;
pub use factory::{DefaultTransportFactory, TransportFactory, create_transport};
pub use traits::Transport;
pub use types::ConnectParams;
#[cfg(feature = "websocket")]
pub use types::WebSocketConnectOptions;
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
