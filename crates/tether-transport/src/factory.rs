//! Creating Transport implementations based on ConnectParams.

use crate::error::TransportError;
use crate::traits::Transport;
use crate::types::ConnectParams;

#[cfg(feature = "websocket")]
use crate::websocket::WebSocketTransport;

/// Builds a fresh, unconnected transport for every connection attempt.
///
/// Owners call this once per attempt; transports are never reused.
pub trait TransportFactory: Send + Sync {
    fn create(&self, params: &ConnectParams) -> Result<Box<dyn Transport>, TransportError>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ConnectParams) -> Result<Box<dyn Transport>, TransportError> + Send + Sync,
{
    fn create(&self, params: &ConnectParams) -> Result<Box<dyn Transport>, TransportError> {
        self(params)
    }
}

/// Factory that selects the transport from the URL scheme, see [`create_transport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, params: &ConnectParams) -> Result<Box<dyn Transport>, TransportError> {
        create_transport(params)
    }
}

/// Creates a boxed `Transport` trait object based on the URL scheme in `ConnectParams`.
///
/// Currently supports `ws://` and `wss://` if the `websocket` feature is enabled.
pub fn create_transport(params: &ConnectParams) -> Result<Box<dyn Transport>, TransportError> {
    let url = &params.url;
    log::debug!("Attempting to create transport for URL: {}", url);

    if url.starts_with("ws://") || url.starts_with("wss://") {
        #[cfg(feature = "websocket")]
        {
            log::debug!("Creating WebSocketTransport for {}", url);
            Ok(Box::new(WebSocketTransport::new(params.clone())))
        }
        #[cfg(not(feature = "websocket"))]
        {
            log::error!("WebSocket URL specified, but 'websocket' feature is not enabled.");
            Err(TransportError::UnsupportedScheme(
                "WebSocket (ws/wss) requires the 'websocket' feature.".to_string(),
            ))
        }
    } else {
        log::error!("Unsupported URL scheme found in: {}", url);
        Err(TransportError::UnsupportedScheme(format!(
            "Scheme not supported or feature not enabled for URL: {}",
            url
        )))
    }
}
