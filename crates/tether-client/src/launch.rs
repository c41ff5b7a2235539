//! Convenience entry point: config, logging, supervisor.

use crate::bus::Bus;
use crate::dispatcher::Dispatcher;
use crate::error::ClientError;
use crate::supervisor::Supervisor;
use log::{debug, info};
use std::sync::Arc;
use tether_core::{Config, load_config, setup_logging};
use tether_transport::DefaultTransportFactory;

/// Builds and starts a [`Supervisor`] using the URL-selected transport.
///
/// # Arguments
/// * `config` - Optional pre-loaded configuration. If None, calls `load_config(None)`.
/// * `bus` - Where connectivity changes and messages are published.
/// * `dispatcher` - Where sessions and the reconnect loop run.
pub fn launch(
    config: Option<Config>,
    bus: Bus,
    dispatcher: Dispatcher,
) -> Result<Supervisor, ClientError> {
    let cfg = match config {
        Some(c) => c,
        None => load_config(None)?,
    };

    if let Err(e) = setup_logging(&cfg.global.log_level) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    info!("Tether client starting for {}", cfg.session.url);
    debug!("Loaded configuration: {:?}", cfg);

    let mut supervisor = Supervisor::new(&cfg, bus, Arc::new(DefaultTransportFactory), dispatcher);
    supervisor.start()?;
    Ok(supervisor)
}
