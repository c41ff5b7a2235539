//! # Tether Core
//!
//! Shared building blocks for the tether crates: layered configuration
//! (`Config`, `SessionConfig`), the core error type and an optional
//! `env_logger` setup helper.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    load_config, Config, GlobalConfig, SessionConfig, TransportConfig, WebSocketConfig,
};
pub use error::CoreError;
pub use logging::setup_logging;
