use crate::error::TransportError;
use async_trait::async_trait;

/// An already-framed, bidirectional text channel to the server.
///
/// Implementations handle the specifics of protocols like WebSockets or TCP.
/// They never reconnect on their own: a transport is connected at most once
/// and replaced wholesale by its owner after it closes.
#[async_trait]
pub trait Transport: Send {
    /// Establishes the connection based on parameters provided during creation.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Closes the connection gracefully.
    ///
    /// Must be safe to call on a transport that is already closed or never connected.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Sends one text frame over the established connection.
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Waits for and returns the next text frame received from the connection.
    ///
    /// # Returns
    /// * `Some(Ok(String))` - Successfully received a message.
    /// * `Some(Err(TransportError))` - An error occurred while receiving.
    /// * `None` - The connection was closed.
    async fn receive(&mut self) -> Option<Result<String, TransportError>>;
}
