//! # Tether Client
//!
//! Keeps a named-event socket connection alive and tells the rest of the
//! application about it.
//!
//! A [`Supervisor`] opens one session at a time. Each session connects its
//! transport, performs the handshake and becomes ready once the server
//! accepts it. Connectivity changes and normalized inbound events are
//! published on a [`Bus`]. When a session drops, the supervisor waits
//! `reconnect_delay` and tries again until stopped.
//!
//! ```no_run
//! use tether_client::{Bus, BusEvent, Dispatcher, launch};
//!
//! #[actix_rt::main]
//! async fn main() -> Result<(), tether_client::ClientError> {
//!     let bus = Bus::default();
//!     let mut events = bus.subscribe();
//!     let mut supervisor = launch(None, bus, Dispatcher::current())?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let BusEvent::MessageReceived { envelope_json } = event {
//!             println!("{envelope_json}");
//!         }
//!     }
//!     supervisor.stop().await;
//!     Ok(())
//! }
//! ```

mod backoff;
mod bus;
mod dispatcher;
mod error;
mod launch;
mod session;
mod supervisor;

pub use backoff::ReconnectBackoff;
pub use bus::{Bus, BusEvent, ConnectionState, SessionId, StatePublisher};
pub use dispatcher::Dispatcher;
pub use error::ClientError;
pub use launch::launch;
pub use session::{Close, Emit, GetStatus, Open, SessionActor, SessionStatus};
pub use supervisor::{Supervisor, SupervisorState};

// Re-export core types if needed by users (e.g. Config for advanced setup)
pub use tether_core::{Config, SessionConfig, load_config};

// Re-export specific Transport types for custom transports and factories
pub use tether_transport::{ConnectParams, Transport, TransportError, TransportFactory};

// Export value for building outbound payloads
pub use serde_json::Value;
