//! # Event bus for connectivity transitions and inbound messages.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Sessions
//! publish through a [`StatePublisher`]; the supervisor and the application
//! subscribe.
//!
//! ```text
//!   Session #1 ──┐                         ┌──► Supervisor (waits for Disconnected)
//!   Session #2 ──┼──► Bus (broadcast) ─────┤
//!   Session #N ──┘                         └──► application subscribers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Ordered**: every subscriber sees events in publish order.
//! - **Lag**: slow receivers get `RecvError::Lagged(n)` and skip the `n` oldest events.
//! - **No persistence**: a receiver only sees events sent after it subscribed.

use std::fmt;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// Connectivity of one session as seen by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Ready,
    Disconnected,
}

/// Identifies one connection attempt. Strictly increasing per supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything the core publishes to the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    ConnectivityChanged {
        session: SessionId,
        state: ConnectionState,
    },
    /// A normalized inbound event, serialized as `{"type": ..., ...}`.
    MessageReceived { envelope_json: String },
}

/// Broadcast channel for [`BusEvent`]s.
///
/// Cheap to clone; all clones feed the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<BusEvent>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    ///
    /// Capacity is shared across all receivers, not per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers the event is dropped.
    pub fn publish(&self, ev: BusEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver for events sent after this call.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Publishes on behalf of one session so every transition carries its id.
#[derive(Clone, Debug)]
pub struct StatePublisher {
    bus: Bus,
    session: SessionId,
}

impl StatePublisher {
    pub fn new(bus: Bus, session: SessionId) -> Self {
        Self { bus, session }
    }

    pub fn connectivity(&self, state: ConnectionState) {
        self.bus.publish(BusEvent::ConnectivityChanged {
            session: self.session,
            state,
        });
    }

    pub fn message(&self, envelope_json: String) {
        self.bus.publish(BusEvent::MessageReceived { envelope_json });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn subscribers_see_events_in_publish_order() {
        let bus = Bus::new(8);
        let mut first = bus.subscribe();
        let publisher = StatePublisher::new(bus.clone(), SessionId(3));

        publisher.connectivity(ConnectionState::Connecting);
        publisher.message("{\"type\":\"x\"}".into());
        publisher.connectivity(ConnectionState::Ready);

        let mut late = bus.subscribe();
        assert_eq!(
            first.try_recv().unwrap(),
            BusEvent::ConnectivityChanged {
                session: SessionId(3),
                state: ConnectionState::Connecting
            }
        );
        assert_eq!(
            first.try_recv().unwrap(),
            BusEvent::MessageReceived {
                envelope_json: "{\"type\":\"x\"}".into()
            }
        );
        assert!(matches!(
            first.try_recv().unwrap(),
            BusEvent::ConnectivityChanged {
                state: ConnectionState::Ready,
                ..
            }
        ));
        // late subscribers only see what comes after them
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = Bus::new(0);
        bus.publish(BusEvent::MessageReceived {
            envelope_json: "{}".into(),
        });
    }

    #[test]
    fn slow_subscribers_lag() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for n in 0..5 {
            bus.publish(BusEvent::MessageReceived {
                envelope_json: n.to_string(),
            });
        }
        assert_eq!(rx.try_recv(), Err(TryRecvError::Lagged(3)));
        assert_eq!(
            rx.try_recv().unwrap(),
            BusEvent::MessageReceived {
                envelope_json: "3".into()
            }
        );
    }
}
