//! Keeps one session alive: connect, wait for it to drop, back off, repeat.
//!
//! ```text
//!   Idle ──start──► Attempting ──open ok──► ConnectedWaiting
//!                      ▲   │                       │ Disconnected on the bus
//!                      │   └──open failed──┐       ▼
//!                      └───── delay ◄──── Backoff ◄┘
//!
//!   any state ──stop──► Stopped
//! ```
//!
//! The loop runs on the [`Dispatcher`] and waits at every step with a
//! cancellation token in a `select!`, so `stop()` ends it promptly from
//! any state, including mid-backoff.

use crate::backoff::ReconnectBackoff;
use crate::bus::{Bus, BusEvent, ConnectionState, SessionId};
use crate::dispatcher::Dispatcher;
use crate::error::ClientError;
use crate::session::{Close, Emit, GetStatus, Open, SessionActor, SessionStatus};
use actix::prelude::*;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tether_core::{Config, SessionConfig};
use tether_protocol::Value;
use tether_transport::{ConnectParams, TransportFactory};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    Idle,
    Attempting,
    ConnectedWaiting,
    Backoff,
    Stopped,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Attempting => "attempting",
            SupervisorState::ConnectedWaiting => "connected-waiting",
            SupervisorState::Backoff => "backoff",
            SupervisorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Everything the loop needs, shared with the owning [`Supervisor`].
struct Shared {
    config: Arc<SessionConfig>,
    params: ConnectParams,
    factory: Arc<dyn TransportFactory>,
    bus: Bus,
    dispatcher: Dispatcher,
    backoff: ReconnectBackoff,
    state: watch::Sender<SupervisorState>,
    session: watch::Sender<Option<Addr<SessionActor>>>,
    last_session: AtomicU64,
}

/// How a connected session ended, as far as the loop is concerned.
enum Outcome {
    Disconnected { reached_ready: bool },
    Cancelled,
}

struct Run {
    token: CancellationToken,
    done: oneshot::Receiver<()>,
}

/// Owns the reconnect loop.
///
/// Dropping the supervisor cancels the loop without waiting for it;
/// call [`Supervisor::stop`] to wait until the session is closed.
pub struct Supervisor {
    shared: Arc<Shared>,
    run: Option<Run>,
}

impl Supervisor {
    pub fn new(
        config: &Config,
        bus: Bus,
        factory: Arc<dyn TransportFactory>,
        dispatcher: Dispatcher,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        let (session, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                config: Arc::new(config.session.clone()),
                params: ConnectParams::from(config),
                factory,
                bus,
                dispatcher,
                backoff: ReconnectBackoff::from_config(&config.session),
                state,
                session,
                last_session: AtomicU64::new(0),
            }),
            run: None,
        }
    }

    /// Starts the loop on the dispatcher. Does nothing if already running.
    ///
    /// The loop subscribes to the bus before the first attempt, so no
    /// transition of its own sessions can be missed.
    pub fn start(&mut self) -> Result<(), ClientError> {
        if self.run.is_some() {
            debug!("Supervisor already running, start ignored");
            return Ok(());
        }

        let token = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();
        let events = self.shared.bus.subscribe();
        let shared = self.shared.clone();
        let loop_token = token.clone();

        info!("Supervisor starting for {}", self.shared.params.url);
        let spawned = self.shared.dispatcher.spawn(async move {
            shared.run(events, loop_token).await;
            let _ = done_tx.send(());
        });
        if !spawned {
            error!("Dispatcher is not running, supervisor not started");
            return Err(ClientError::DispatcherUnavailable);
        }

        self.run = Some(Run {
            token,
            done: done_rx,
        });
        Ok(())
    }

    /// Cancels the loop and waits until the current session is closed.
    ///
    /// Safe to call repeatedly and before [`start`](Self::start); a
    /// supervisor that never started stays `Idle`.
    pub async fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            debug!("Supervisor not running, stop ignored");
            return;
        };

        info!("Supervisor stopping");
        run.token.cancel();
        // Err means the loop was dropped with its dispatcher; nothing left to wait for.
        let _ = run.done.await;
        self.shared.session.send_replace(None);
        self.shared.state.send_replace(SupervisorState::Stopped);
        info!("Supervisor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn state(&self) -> SupervisorState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.shared.state.subscribe()
    }

    pub fn bus(&self) -> &Bus {
        &self.shared.bus
    }

    /// Queues `[event, payload]` on the current session without waiting.
    ///
    /// Dropped with a warning when there is no session or it is not ready.
    pub fn send(&self, event: impl Into<String>, payload: Value) {
        let event = event.into();
        match self.current_session() {
            Some(session) => session.do_send(Emit { event, payload }),
            None => warn!("No active session, dropping outbound event '{}'", event),
        }
    }

    /// Like [`send`](Self::send), but resolves to whether the event was
    /// handed to the transport.
    pub async fn emit(&self, event: impl Into<String>, payload: Value) -> bool {
        let event = event.into();
        let Some(session) = self.current_session() else {
            warn!("No active session, dropping outbound event '{}'", event);
            return false;
        };
        session.send(Emit { event, payload }).await.unwrap_or(false)
    }

    /// Status of the current session, `None` between sessions.
    pub async fn session_status(&self) -> Result<Option<SessionStatus>, ClientError> {
        match self.current_session() {
            Some(session) => Ok(Some(session.send(GetStatus).await?)),
            None => Ok(None),
        }
    }

    fn current_session(&self) -> Option<Addr<SessionActor>> {
        self.shared.session.borrow().clone()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.token.cancel();
        }
    }
}

impl Shared {
    async fn run(&self, mut events: broadcast::Receiver<BusEvent>, token: CancellationToken) {
        // Consecutive attempts since the last Ready; indexes the backoff.
        let mut failures: u32 = 0;

        // Yields the session still open when cancellation arrived, if any.
        let open_session = loop {
            self.set_state(SupervisorState::Attempting);
            let id = SessionId(self.last_session.fetch_add(1, Ordering::Relaxed) + 1);
            let session = self.spawn_session(id);
            self.session.send_replace(Some(session.clone()));
            info!("Connection attempt with session {}", id);

            let opened = tokio::select! {
                _ = token.cancelled() => break Some(session),
                opened = session.send(Open) => opened,
            };

            match opened {
                Ok(Ok(())) => {
                    self.set_state(SupervisorState::ConnectedWaiting);
                    match self
                        .wait_for_disconnect(&mut events, &session, id, &token)
                        .await
                    {
                        Outcome::Cancelled => break Some(session),
                        Outcome::Disconnected { reached_ready: true } => failures = 0,
                        Outcome::Disconnected { reached_ready: false } => {}
                    }
                }
                Ok(Err(e)) => warn!("Session {} could not connect: {}", id, e),
                Err(e) => error!("Session {} mailbox closed: {}", id, e),
            }

            retire(session).await;
            self.session.send_replace(None);

            let delay = self.backoff.next(failures);
            failures = failures.saturating_add(1);
            self.set_state(SupervisorState::Backoff);
            info!("Reconnecting in {:?}", delay);

            tokio::select! {
                _ = token.cancelled() => break None,
                _ = tokio::time::sleep(delay) => {}
            }
        };

        if let Some(session) = open_session {
            retire(session).await;
        }
        self.session.send_replace(None);
        drop(events);
        self.set_state(SupervisorState::Stopped);
        debug!("Supervisor loop finished");
    }

    fn spawn_session(&self, id: SessionId) -> Addr<SessionActor> {
        let config = self.config.clone();
        let params = self.params.clone();
        let factory = self.factory.clone();
        let bus = self.bus.clone();
        self.dispatcher
            .start(move |_| SessionActor::new(id, config, params, factory, bus))
    }

    /// Waits for `Disconnected` from session `id`, noting whether it was ever `Ready`.
    async fn wait_for_disconnect(
        &self,
        events: &mut broadcast::Receiver<BusEvent>,
        session: &Addr<SessionActor>,
        id: SessionId,
        token: &CancellationToken,
    ) -> Outcome {
        let mut reached_ready = false;
        loop {
            let received = tokio::select! {
                _ = token.cancelled() => return Outcome::Cancelled,
                received = events.recv() => received,
            };

            match received {
                Ok(BusEvent::ConnectivityChanged { session: from, state }) if from == id => {
                    match state {
                        ConnectionState::Ready => reached_ready = true,
                        ConnectionState::Disconnected => {
                            return Outcome::Disconnected { reached_ready };
                        }
                        ConnectionState::Connecting => {}
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Supervisor missed {} bus events, asking session {} directly",
                        skipped, id
                    );
                    match session.send(GetStatus).await {
                        Ok(status) if status.state == ConnectionState::Disconnected => {
                            return Outcome::Disconnected { reached_ready };
                        }
                        Ok(status) => reached_ready |= status.ready,
                        Err(_) => return Outcome::Disconnected { reached_ready },
                    }
                }
                Err(RecvError::Closed) => return Outcome::Cancelled,
            }
        }
    }

    fn set_state(&self, state: SupervisorState) {
        debug!("Supervisor state -> {}", state);
        self.state.send_replace(state);
    }
}

/// Closes a session and lets it stop once its address is dropped.
async fn retire(session: Addr<SessionActor>) {
    if let Err(e) = session.send(Close).await {
        debug!("Session already gone while closing: {}", e);
    }
}
