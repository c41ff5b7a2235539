//! Scripted transport shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_client::{
    Bus, BusEvent, Config, ConnectParams, ConnectionState, SessionId, Transport, TransportError,
    TransportFactory,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

/// How the next created transport answers `connect()`.
#[derive(Debug, Clone)]
pub enum ConnectPlan {
    Succeed,
    Fail(TransportError),
    Hang,
}

enum Inbound {
    Frame(String),
    Fail(TransportError),
    Close,
}

struct MockTransport {
    plan: ConnectPlan,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
    disconnected: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        match self.plan.clone() {
            ConnectPlan::Succeed => Ok(()),
            ConnectPlan::Fail(e) => Err(e),
            ConnectPlan::Hang => std::future::pending().await,
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn receive(&mut self) -> Option<Result<String, TransportError>> {
        match self.inbound.recv().await {
            Some(Inbound::Frame(text)) => Some(Ok(text)),
            Some(Inbound::Fail(e)) => Some(Err(e)),
            Some(Inbound::Close) | None => None,
        }
    }
}

/// The test's end of one created transport.
#[derive(Clone)]
pub struct MockLink {
    tx: mpsc::UnboundedSender<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
    disconnected: Arc<AtomicBool>,
}

impl MockLink {
    pub fn push(&self, raw: &str) {
        let _ = self.tx.send(Inbound::Frame(raw.to_string()));
    }

    pub fn ack(&self, status: &str) {
        self.push(&format!(r#"["handshake_ack",{{"status":"{status}"}}]"#));
    }

    pub fn fail(&self, error: TransportError) {
        let _ = self.tx.send(Inbound::Fail(error));
    }

    /// Server-side close.
    pub fn close(&self) {
        let _ = self.tx.send(Inbound::Close);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct FactoryState {
    plans: VecDeque<ConnectPlan>,
    fallback: Option<ConnectPlan>,
    links: Vec<MockLink>,
    created_at: Vec<Instant>,
}

/// Hands out mock transports following a queue of connect plans
/// (`Succeed` once the queue is empty, unless a fallback is set).
#[derive(Clone, Default)]
pub struct MockFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, plan: ConnectPlan) -> &Self {
        self.state.lock().unwrap().plans.push_back(plan);
        self
    }

    pub fn fail_next(&self, attempts: usize) -> &Self {
        for _ in 0..attempts {
            self.plan(ConnectPlan::Fail(TransportError::ConnectionFailed(
                "connection refused".into(),
            )));
        }
        self
    }

    pub fn always(&self, plan: ConnectPlan) -> &Self {
        self.state.lock().unwrap().fallback = Some(plan);
        self
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().created_at.len()
    }

    pub fn created_at(&self) -> Vec<Instant> {
        self.state.lock().unwrap().created_at.clone()
    }

    pub fn link(&self, index: usize) -> MockLink {
        self.state.lock().unwrap().links[index].clone()
    }

    pub fn shared(&self) -> Arc<dyn TransportFactory> {
        Arc::new(self.clone())
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, _params: &ConnectParams) -> Result<Box<dyn Transport>, TransportError> {
        let mut state = self.state.lock().unwrap();
        let plan = state
            .plans
            .pop_front()
            .or_else(|| state.fallback.clone())
            .unwrap_or(ConnectPlan::Succeed);

        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let disconnected = Arc::new(AtomicBool::new(false));
        state.links.push(MockLink {
            tx,
            sent: sent.clone(),
            disconnected: disconnected.clone(),
        });
        state.created_at.push(Instant::now());

        Ok(Box::new(MockTransport {
            plan,
            inbound: rx,
            sent,
            disconnected,
        }))
    }
}

pub const DELAY: Duration = Duration::from_secs(5);

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.session.url = "ws://mock.test:3000".into();
    config.session.reconnect_delay = DELAY;
    config.session.connection_timeout = Duration::from_secs(10);
    config
}

/// Lets every ready task run. The paused clock only advances once the
/// runtime is idle, so anything already queued completes first.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Waits (on the paused clock) for the next event matching `pred`.
pub async fn next_matching<F>(rx: &mut broadcast::Receiver<BusEvent>, mut pred: F) -> BusEvent
where
    F: FnMut(&BusEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            let event = rx.recv().await.expect("bus closed or lagged");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected bus event never arrived")
}

pub async fn wait_for_state(
    rx: &mut broadcast::Receiver<BusEvent>,
    session: u64,
    state: ConnectionState,
) {
    let want = BusEvent::ConnectivityChanged {
        session: SessionId(session),
        state,
    };
    next_matching(rx, |event| *event == want).await;
}

/// Everything published so far that is still buffered.
pub fn drain(rx: &mut broadcast::Receiver<BusEvent>) -> Vec<BusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn connectivity(events: &[BusEvent]) -> Vec<(u64, ConnectionState)> {
    events
        .iter()
        .filter_map(|event| match event {
            BusEvent::ConnectivityChanged { session, state } => Some((session.0, *state)),
            BusEvent::MessageReceived { .. } => None,
        })
        .collect()
}

pub fn messages(events: &[BusEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            BusEvent::MessageReceived { envelope_json } => Some(envelope_json.clone()),
            BusEvent::ConnectivityChanged { .. } => None,
        })
        .collect()
}

pub fn bus() -> Bus {
    Bus::new(256)
}
