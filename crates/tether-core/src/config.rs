use crate::error::CoreError;
use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::{path::Path, time::Duration};

// Helper for deserializing Duration from milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Same as above for optional durations; a missing key stays `None`.
mod duration_ms_opt_serde {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

// Main configuration structure
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)] // Ensure fields default if missing in config source
pub struct Config {
    pub global: GlobalConfig,
    pub session: SessionConfig,
    pub transport: TransportConfig,
}

// Global settings
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Everything a session and its supervisor need to reach the server and
/// complete the handshake. Read-only once loaded.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Full server URL (`ws://` or `wss://`).
    pub url: String,
    #[serde(rename = "connection_timeout_ms", deserialize_with = "duration_ms_serde::deserialize")]
    pub connection_timeout: Duration,
    /// Delay before the first reconnect attempt. Also the lower bound for every later delay.
    #[serde(rename = "reconnect_delay_ms", deserialize_with = "duration_ms_serde::deserialize")]
    pub reconnect_delay: Duration,
    /// Upper bound for grown delays. `None` caps at `reconnect_delay`, i.e. a fixed delay.
    #[serde(
        rename = "max_reconnect_delay_ms",
        deserialize_with = "duration_ms_opt_serde::deserialize"
    )]
    pub max_reconnect_delay: Option<Duration>,
    /// Growth factor between consecutive failed attempts (`1.0` = constant).
    pub backoff_factor: f64,
    pub handshake_event: String,
    /// JSON text sent as the handshake payload. Parsed at send time.
    pub handshake_payload: String,
    pub handshake_ack_event: String,
    pub success_status_value: String,
    /// Forces a reconnect when the ack does not arrive in time. Off by default.
    #[serde(
        rename = "handshake_timeout_ms",
        deserialize_with = "duration_ms_opt_serde::deserialize"
    )]
    pub handshake_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000".to_string(),
            connection_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: None,
            backoff_factor: 1.0,
            handshake_event: "handshake".to_string(),
            handshake_payload: r#"{"type":"manager","version":"1.0.0"}"#.to_string(),
            handshake_ack_event: "handshake_ack".to_string(),
            success_status_value: "accepted".to_string(),
            handshake_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Rejects values the supervisor cannot work with.
    ///
    /// The handshake payload is deliberately not checked here: an invalid
    /// payload is reported when the handshake is about to be sent.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.url.trim().is_empty() {
            return Err(CoreError::InvalidConfig("session.url is empty".into()));
        }
        if self.connection_timeout.is_zero() {
            return Err(CoreError::InvalidConfig(
                "session.connection_timeout_ms must be greater than zero".into(),
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(CoreError::InvalidConfig(format!(
                "session.backoff_factor must be >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        for (key, value) in [
            ("session.handshake_event", &self.handshake_event),
            ("session.handshake_ack_event", &self.handshake_ack_event),
        ] {
            if value.is_empty() {
                return Err(CoreError::InvalidConfig(format!("{key} is empty")));
            }
        }
        Ok(())
    }
}

// Transport layer configuration
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TransportConfig {
    pub websocket: WebSocketConfig,
}

// WebSocket specific configuration
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WebSocketConfig {
    pub max_message_size: Option<usize>,
    pub max_frame_size: Option<usize>,
    // Default to false, as it's less common
    pub accept_unmasked_frames: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: Some(64 << 20),
            max_frame_size: Some(16 << 20),
            accept_unmasked_frames: false,
        }
    }
}

/// Loads configuration from a file and environment variables.
///
/// With `path == None` an optional `tether.toml` (or `.json`, `.yaml`, etc.)
/// in the current directory is used; an explicit path must exist.
/// Overrides with environment variables prefixed with `TETHER__`
/// (e.g., `TETHER__SESSION__URL=ws://host:3000`,
/// `TETHER__SESSION__RECONNECT_DELAY_MS=2000`).
/// Note the double underscore `__` for nested fields.
pub fn load_config(path: Option<&Path>) -> Result<Config, CoreError> {
    let mut builder = ConfigLoader::builder().set_default("global.log_level", "info")?;

    builder = match path {
        Some(path) => {
            log::debug!("Loading configuration from: {:?}", path);
            builder.add_source(File::from(path).required(true))
        }
        None => {
            log::debug!("Attempting to load configuration from default location (tether.toml)");
            builder.add_source(File::with_name("tether").required(false))
        }
    };

    let cfg: Config = builder
        .add_source(
            Environment::with_prefix("TETHER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    cfg.session.validate()?;
    log::debug!("Successfully loaded configuration: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn defaults_match_reference_values() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.connection_timeout, Duration::from_secs(10));
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
        assert_eq!(cfg.handshake_ack_event, "handshake_ack");
        assert_eq!(cfg.success_status_value, "accepted");
        assert_eq!(cfg.handshake_timeout, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn loads_session_section_from_file() {
        let file = write_toml(
            r#"
            [global]
            log_level = "debug"

            [session]
            url = "ws://example.test:4000"
            reconnect_delay_ms = 250
            handshake_timeout_ms = 1500
            success_status_value = "ok"

            [transport.websocket]
            max_message_size = 1024
            "#,
        );

        let cfg = load_config(Some(file.path())).expect("config loads");
        assert_eq!(cfg.global.log_level, "debug");
        assert_eq!(cfg.session.url, "ws://example.test:4000");
        assert_eq!(cfg.session.reconnect_delay, Duration::from_millis(250));
        assert_eq!(cfg.session.handshake_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.session.success_status_value, "ok");
        // untouched keys keep their defaults
        assert_eq!(cfg.session.handshake_event, "handshake");
        assert_eq!(cfg.session.connection_timeout, Duration::from_secs(10));
        assert_eq!(cfg.transport.websocket.max_message_size, Some(1024));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_config(Some(&missing)),
            Err(CoreError::ConfigLoad(_))
        ));
    }

    #[test]
    fn rejects_shrinking_backoff() {
        let file = write_toml(
            r#"
            [session]
            backoff_factor = 0.5
            "#,
        );
        assert!(matches!(
            load_config(Some(file.path())),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_empty_url() {
        let cfg = SessionConfig {
            url: "  ".into(),
            ..SessionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
