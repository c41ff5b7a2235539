use std::time::Duration;
use tether_core::Config;

/// Parameters required to establish a connection.
#[derive(Clone, Debug)]
pub struct ConnectParams {
    /// The full URL for the connection (e.g., "ws://127.0.0.1:3000").
    /// The scheme determines the transport type (ws, wss, etc.).
    pub url: String,

    /// Connection timeout. Applied by the owner around `Transport::connect`.
    pub connection_timeout: Duration,

    /// Options specific to WebSocket connections.
    #[cfg(feature = "websocket")]
    pub ws_options: WebSocketConnectOptions,
}

impl ConnectParams {
    pub fn new(url: impl Into<String>, connection_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connection_timeout,
            #[cfg(feature = "websocket")]
            ws_options: WebSocketConnectOptions::default(),
        }
    }
}

impl From<&Config> for ConnectParams {
    fn from(config: &Config) -> Self {
        Self {
            url: config.session.url.clone(),
            connection_timeout: config.session.connection_timeout,
            #[cfg(feature = "websocket")]
            ws_options: WebSocketConnectOptions {
                max_message_size: config.transport.websocket.max_message_size,
                max_frame_size: config.transport.websocket.max_frame_size,
                accept_unmasked_frames: config.transport.websocket.accept_unmasked_frames,
            },
        }
    }
}

/// Options specific to WebSocket connections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg(feature = "websocket")]
pub struct WebSocketConnectOptions {
    pub max_message_size: Option<usize>,
    pub max_frame_size: Option<usize>,
    pub accept_unmasked_frames: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_follow_loaded_config() {
        let mut config = Config::default();
        config.session.url = "wss://server.test/socket".into();
        config.session.connection_timeout = Duration::from_millis(750);

        let params = ConnectParams::from(&config);
        assert_eq!(params.url, "wss://server.test/socket");
        assert_eq!(params.connection_timeout, Duration::from_millis(750));
        #[cfg(feature = "websocket")]
        assert_eq!(
            params.ws_options.max_message_size,
            config.transport.websocket.max_message_size
        );
    }
}
