//! Implementation of the `Transport` trait using WebSockets (`tokio-tungstenite`).

use crate::error::TransportError;
use crate::traits::Transport;
use crate::types::{ConnectParams, WebSocketConnectOptions};
use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use log::{debug, info, trace, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config,
    tungstenite::{
        Error as TungsteniteError,
        protocol::{Message as TungsteniteMessage, WebSocketConfig},
    },
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, TungsteniteMessage>;
type WsSource = SplitStream<WsStream>;

/// WebSocket transport implementation.
pub struct WebSocketTransport {
    params: ConnectParams,
    sink: Option<WsSink>,
    source: Option<WsSource>,
}

impl WebSocketTransport {
    pub fn new(params: ConnectParams) -> Self {
        Self {
            params,
            sink: None,
            source: None,
        }
    }

    fn apply_options(options: &WebSocketConnectOptions) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.max_message_size = options.max_message_size;
        config.max_frame_size = options.max_frame_size;
        config.accept_unmasked_frames = options.accept_unmasked_frames;
        config
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.sink.is_some() || self.source.is_some() {
            warn!("WebSocketTransport already connected or partially connected.");
            return Err(TransportError::ConnectionFailed("Already connected".into()));
        }

        info!("Connecting WebSocket to {}", self.params.url);
        let ws_config = Self::apply_options(&self.params.ws_options);
        let (ws_stream, response) =
            connect_async_with_config(self.params.url.as_str(), Some(ws_config), false).await?;
        debug!("WebSocket upgrade successful: status {}", response.status());

        let (sink, source) = ws_stream.split();
        self.sink = Some(sink);
        self.source = Some(source);

        info!("WebSocket connection established.");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.source = None;
        let Some(mut sink) = self.sink.take() else {
            debug!("WebSocket already disconnected.");
            return Ok(());
        };

        info!("Disconnecting WebSocket.");
        match sink.send(TungsteniteMessage::Close(None)).await {
            Ok(()) => debug!("WebSocket Close frame sent."),
            Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed) => {
                debug!("WebSocket already closed while sending Close frame.")
            }
            Err(e) => warn!("Error sending WebSocket Close frame: {}. Closing anyway.", e),
        }
        match sink.close().await {
            Ok(()) | Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed) => {}
            Err(e) => warn!("Error closing WebSocket sink: {}", e),
        }

        info!("WebSocket disconnected.");
        Ok(())
    }

    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| TransportError::NotConnected("WebSocket sink unavailable".into()))?;

        trace!("Sending WebSocket message: {}", message);
        sink.send(TungsteniteMessage::Text(message.to_string()))
            .await?;
        Ok(())
    }

    async fn receive(&mut self) -> Option<Result<String, TransportError>> {
        let source = self.source.as_mut()?; // Returns None if source is None

        // Control frames are answered by tungstenite itself; keep waiting for data.
        loop {
            match source.next().await {
                Some(Ok(TungsteniteMessage::Text(text))) => {
                    trace!("Received WebSocket Text: {}", text);
                    return Some(Ok(text));
                }
                Some(Ok(TungsteniteMessage::Binary(bin))) => {
                    warn!(
                        "Received unexpected WebSocket Binary message ({} bytes), ignoring.",
                        bin.len()
                    );
                }
                Some(Ok(TungsteniteMessage::Ping(_) | TungsteniteMessage::Pong(_))) => {
                    trace!("WebSocket control frame received.");
                }
                Some(Ok(TungsteniteMessage::Frame(_))) => {
                    warn!("Received unexpected WebSocket raw frame, ignoring.");
                }
                Some(Ok(TungsteniteMessage::Close(close_frame))) => {
                    info!("Received WebSocket Close frame: {:?}", close_frame);
                    return None;
                }
                Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)) => {
                    info!("WebSocket connection closed while receiving.");
                    return None;
                }
                Some(Err(e)) => return Some(Err(e.into())),
                None => {
                    info!("WebSocket stream ended.");
                    return None;
                }
            }
        }
    }
}
