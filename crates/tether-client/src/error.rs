//! Errors specific to client orchestration and launch.

use actix::MailboxError;
use tether_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration loading failed: {0}")]
    Config(#[from] CoreError),

    /// The session actor stopped before it could answer.
    #[error("Session mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Dispatcher is not running")]
    DispatcherUnavailable,
}
