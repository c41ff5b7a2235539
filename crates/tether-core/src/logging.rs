//! Optional helper for setting up logging using `env_logger`.
//!
//! The configured `global.log_level` is the default filter. `TETHER_LOG`
//! (same syntax as `RUST_LOG`) overrides it. Socket-stack and actor
//! framework crates are capped so frame-level chatter stays out of `debug`.

use crate::error::CoreError;
use log::LevelFilter;

/// Crates that log every frame or mailbox event at `debug`/`trace`.
const NOISY_MODULES: &[(&str, LevelFilter)] = &[
    ("tungstenite", LevelFilter::Info),
    ("tokio_tungstenite", LevelFilter::Info),
    ("rustls", LevelFilter::Info),
    ("actix", LevelFilter::Warn),
    ("actix_rt", LevelFilter::Warn),
];

/// Parses a configured level, falling back to `Info` for unknown names.
pub fn parse_level(log_level_str: &str) -> LevelFilter {
    log_level_str.trim().parse().unwrap_or(LevelFilter::Info)
}

#[cfg(feature = "env_logger")]
pub fn setup_logging(log_level_str: &str) -> Result<(), CoreError> {
    use env_logger::{Builder, Env};

    let level = parse_level(log_level_str);
    let mut builder = Builder::from_env(Env::new().filter_or("TETHER_LOG", level.to_string()));
    for (module, cap) in NOISY_MODULES {
        builder.filter_module(module, level.min(*cap));
    }

    builder
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| CoreError::LoggingSetup(e.to_string()))
}

#[cfg(not(feature = "env_logger"))]
pub fn setup_logging(log_level_str: &str) -> Result<(), CoreError> {
    log::debug!(
        "env_logger feature not enabled, logging setup skipped (level {}, {} crates capped)",
        parse_level(log_level_str),
        NOISY_MODULES.len()
    );
    Ok(())
}
