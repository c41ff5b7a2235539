//! One connection attempt: a transport, its handshake, its readiness.
//!
//! ```text
//!   Open ──► Connecting ──connect ok──► handshake sent ──ack ok──► Ready
//!               │                                                   │
//!               └── connect failed / closed / timeout ──► Disconnected ◄┘
//! ```
//!
//! The transport itself lives in a pump task spawned on the actor's
//! context. The pump forwards inbound text to the actor as
//! [`TransportNotice`]s tagged with a generation number; notices from a
//! transport that has since been replaced are ignored.

use crate::bus::{Bus, ConnectionState, SessionId, StatePublisher};
use actix::prelude::*;
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tether_core::SessionConfig;
use tether_protocol::{
    AckVerdict, Frame, HandshakeRequest, Value, evaluate_ack, is_reserved, normalize,
};
use tether_transport::{ConnectParams, Transport, TransportError, TransportFactory};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const OUTGOING_BUFFER: usize = 64;

// --- Messages ---

/// Tears down any previous transport and starts a new connection attempt.
///
/// Resolves once the transport is connected (and the handshake queued),
/// or with the error that ended the attempt.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "Result<(), TransportError>")]
pub struct Open;

/// Drops the transport, or aborts a connect still in flight. Safe to send repeatedly.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct Close;

/// Sends `[event, payload]` if the session is ready. Resolves to whether it was sent.
#[derive(Message, Debug, Clone)]
#[rtype(result = "bool")]
pub struct Emit {
    pub event: String,
    pub payload: Value,
}

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "SessionStatus")]
pub struct GetStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, MessageResponse)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub ready: bool,
}

/// Reported by the pump task that owns the transport.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct TransportNotice {
    generation: u64,
    event: TransportEvent,
}

#[derive(Debug)]
enum TransportEvent {
    Frame(String),
    Error(TransportError),
    Closed,
}

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct HandshakeDeadline {
    generation: u64,
}

// --- Actor ---

/// Handle to the pump task of the live transport.
struct Link {
    generation: u64,
    outgoing: mpsc::Sender<String>,
}

pub struct SessionActor {
    id: SessionId,
    config: Arc<SessionConfig>,
    params: ConnectParams,
    factory: Arc<dyn TransportFactory>,
    publisher: StatePublisher,
    state: ConnectionState,
    ready: bool,
    // Bumped on every Open and Close; pending work from older values is stale.
    generation: u64,
    // Present only while a connected transport is being pumped.
    link: Option<Link>,
    // Present only while a connect is in flight.
    connecting: Option<CancellationToken>,
}

impl SessionActor {
    pub fn new(
        id: SessionId,
        config: Arc<SessionConfig>,
        params: ConnectParams,
        factory: Arc<dyn TransportFactory>,
        bus: Bus,
    ) -> Self {
        Self {
            id,
            config,
            params,
            factory,
            publisher: StatePublisher::new(bus, id),
            state: ConnectionState::Disconnected,
            ready: false,
            generation: 0,
            link: None,
            connecting: None,
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        info!("Session {} state -> {:?}", self.id, state);
        self.state = state;
        self.publisher.connectivity(state);
    }

    /// Drops the live transport, if any. The pump notices the closed
    /// channel and disconnects the transport on its own.
    fn drop_link(&mut self) -> bool {
        self.ready = false;
        self.link.take().is_some()
    }

    /// Aborts an in-flight connect; its transport is disconnected right away.
    fn abort_connect(&mut self) -> bool {
        match self.connecting.take() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn on_connected(
        &mut self,
        generation: u64,
        result: Result<Box<dyn Transport>, TransportError>,
        ctx: &mut Context<Self>,
    ) -> Result<(), TransportError> {
        if generation != self.generation {
            debug!(
                "Session {}: connect attempt {} finished after being superseded",
                self.id, generation
            );
            if let Ok(mut transport) = result {
                ctx.spawn(
                    async move {
                        let _ = transport.disconnect().await;
                    }
                    .into_actor(self),
                );
            }
            return Err(TransportError::Cancelled);
        }

        self.connecting = None;
        match result {
            Ok(transport) => {
                let (tx, rx) = mpsc::channel(OUTGOING_BUFFER);
                let pump = pump(transport, rx, ctx.address(), generation);
                ctx.spawn(pump.into_actor(self));
                self.link = Some(Link {
                    generation,
                    outgoing: tx,
                });
                info!("Session {} connected to {}", self.id, self.params.url);
                self.send_handshake(ctx);
                Ok(())
            }
            Err(e) => {
                warn!("Session {} failed to connect: {}", self.id, e);
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    fn send_handshake(&mut self, ctx: &mut Context<Self>) {
        match HandshakeRequest::new(&self.config.handshake_event, &self.config.handshake_payload) {
            Ok(request) => {
                info!("Session {} sending handshake '{}'", self.id, request.event());
                self.push(request.into_frame());
            }
            Err(e) => {
                error!(
                    "Session {}: {}. Handshake not sent, session stays Connecting.",
                    self.id, e
                );
            }
        }

        if let Some(timeout) = self.config.handshake_timeout {
            ctx.notify_later(
                HandshakeDeadline {
                    generation: self.generation,
                },
                timeout,
            );
        }
    }

    /// Queues a frame for the pump. Returns false if it could not be queued.
    fn push(&self, frame: Frame) -> bool {
        let Some(link) = &self.link else {
            warn!("Session {}: no transport, dropping '{}'", self.id, frame.event);
            return false;
        };
        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                error!("Session {}: {}", self.id, e);
                return false;
            }
        };
        match link.outgoing.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "Session {}: outgoing buffer full, dropping '{}'",
                    self.id, frame.event
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(
                    "Session {}: transport already gone, dropping '{}'",
                    self.id, frame.event
                );
                false
            }
        }
    }

    fn on_frame(&mut self, raw: &str) {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Session {} dropping inbound frame: {}", self.id, e);
                return;
            }
        };

        if is_reserved(&frame.event) {
            trace!("Session {} ignoring transport event '{}'", self.id, frame.event);
            return;
        }
        if frame.event == self.config.handshake_ack_event {
            self.on_ack(frame.payload());
            return;
        }

        let (event, payload) = frame.into_parts();
        let Some(envelope) = normalize(&event, payload) else {
            debug!("Session {}: event '{}' has no payload, dropped", self.id, event);
            return;
        };
        match envelope.to_json() {
            Ok(json) => {
                trace!("Session {} publishing {}", self.id, json);
                self.publisher.message(json);
            }
            Err(e) => error!("Session {}: {}", self.id, e),
        }
    }

    fn on_ack(&mut self, payload: Option<&Value>) {
        match evaluate_ack(payload, &self.config.success_status_value) {
            AckVerdict::Accepted if self.ready => {
                debug!("Session {}: duplicate handshake ack ignored", self.id);
            }
            AckVerdict::Accepted => {
                info!("Session {} handshake accepted", self.id);
                self.ready = true;
                self.set_state(ConnectionState::Ready);
            }
            AckVerdict::Rejected { status } => {
                warn!(
                    "Session {} handshake rejected. Status: {}",
                    self.id,
                    status.as_deref().unwrap_or("<missing>")
                );
            }
        }
    }
}

impl Actor for SessionActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        debug!("Session {} started for {}", self.id, self.params.url);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.abort_connect();
        self.drop_link();
        debug!("Session {} stopped", self.id);
    }
}

// --- Message Handlers ---

impl Handler<Open> for SessionActor {
    type Result = ResponseActFuture<Self, Result<(), TransportError>>;

    fn handle(&mut self, _msg: Open, _ctx: &mut Context<Self>) -> Self::Result {
        if self.abort_connect() {
            debug!("Session {}: abandoning connect in flight", self.id);
        }
        if self.drop_link() {
            debug!("Session {}: replacing live transport", self.id);
        }
        self.generation += 1;
        let generation = self.generation;
        self.set_state(ConnectionState::Connecting);

        let transport = match self.factory.create(&self.params) {
            Ok(transport) => transport,
            Err(e) => {
                error!("Session {} could not create transport: {}", self.id, e);
                self.set_state(ConnectionState::Disconnected);
                return Box::pin(async move { Err::<(), _>(e) }.into_actor(self));
            }
        };

        info!("Session {} connecting to {}", self.id, self.params.url);
        let cancel = CancellationToken::new();
        self.connecting = Some(cancel.clone());
        Box::pin(
            connect(transport, self.params.connection_timeout, cancel)
                .into_actor(self)
                .map(move |result, act, ctx| act.on_connected(generation, result, ctx)),
        )
    }
}

impl Handler<Close> for SessionActor {
    type Result = ();

    fn handle(&mut self, _msg: Close, _ctx: &mut Context<Self>) {
        self.generation += 1;
        if self.abort_connect() {
            info!("Session {} connect aborted", self.id);
        }
        if self.drop_link() {
            info!("Session {} closed", self.id);
        }
        if self.state != ConnectionState::Disconnected {
            self.set_state(ConnectionState::Disconnected);
        }
    }
}

impl Handler<Emit> for SessionActor {
    type Result = bool;

    fn handle(&mut self, msg: Emit, _ctx: &mut Context<Self>) -> bool {
        if self.link.is_none() || !self.ready {
            warn!(
                "Session {} not ready, dropping outbound event '{}'",
                self.id, msg.event
            );
            return false;
        }
        self.push(Frame::new(msg.event, msg.payload))
    }
}

impl Handler<GetStatus> for SessionActor {
    type Result = SessionStatus;

    fn handle(&mut self, _msg: GetStatus, _ctx: &mut Context<Self>) -> SessionStatus {
        SessionStatus {
            state: self.state,
            ready: self.ready,
        }
    }
}

impl Handler<TransportNotice> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: TransportNotice, _ctx: &mut Context<Self>) {
        let live = self.link.as_ref().map(|link| link.generation);
        if live != Some(msg.generation) {
            trace!(
                "Session {} ignoring notice from stale transport {}",
                self.id, msg.generation
            );
            return;
        }

        match msg.event {
            TransportEvent::Frame(raw) => self.on_frame(&raw),
            TransportEvent::Error(e) => error!("Session {} transport error: {}", self.id, e),
            TransportEvent::Closed => {
                info!("Session {} transport closed", self.id);
                self.drop_link();
                self.set_state(ConnectionState::Disconnected);
            }
        }
    }
}

impl Handler<HandshakeDeadline> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: HandshakeDeadline, _ctx: &mut Context<Self>) {
        if msg.generation != self.generation || self.link.is_none() || self.ready {
            return;
        }
        warn!(
            "Session {}: no accepted handshake ack within {:?}, dropping transport",
            self.id,
            self.config.handshake_timeout.unwrap_or_default()
        );
        self.drop_link();
        self.set_state(ConnectionState::Disconnected);
    }
}

// --- Transport Tasks ---

async fn connect(
    mut transport: Box<dyn Transport>,
    timeout: Duration,
    cancel: CancellationToken,
) -> Result<Box<dyn Transport>, TransportError> {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => None,
        outcome = tokio::time::timeout(timeout, transport.connect()) => Some(outcome),
    };
    let error = match outcome {
        Some(Ok(Ok(()))) => return Ok(transport),
        Some(Ok(Err(e))) => return Err(e),
        Some(Err(_)) => TransportError::Timeout,
        None => TransportError::Cancelled,
    };
    let _ = transport.disconnect().await;
    Err(error)
}

/// Owns the transport until either side closes it.
///
/// Ends when the remote side closes (reported as `Closed`) or when the
/// session drops its sender (no report, the session already knows).
async fn pump(
    mut transport: Box<dyn Transport>,
    mut outgoing: mpsc::Receiver<String>,
    session: Addr<SessionActor>,
    generation: u64,
) {
    let notify = |event| session.do_send(TransportNotice { generation, event });

    loop {
        tokio::select! {
            queued = outgoing.recv() => match queued {
                Some(text) => {
                    if let Err(e) = transport.send(&text).await {
                        warn!("Failed to emit frame: {}", e);
                    }
                }
                None => break,
            },
            received = transport.receive() => match received {
                Some(Ok(text)) => notify(TransportEvent::Frame(text)),
                Some(Err(e)) => {
                    notify(TransportEvent::Error(e));
                    notify(TransportEvent::Closed);
                    break;
                }
                None => {
                    notify(TransportEvent::Closed);
                    break;
                }
            },
        }
    }

    if let Err(e) = transport.disconnect().await {
        debug!("Ignoring error while disconnecting transport: {}", e);
    }
}
