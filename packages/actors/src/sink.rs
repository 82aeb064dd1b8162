//! Event sink trait and the in-process session hub.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use pipeline_core::WireMessage;
use tokio::sync::mpsc;

/// Future type for sink deliveries.
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Delivers named events to subscribers.
///
/// Emission is fire-and-forget: an unreachable subscriber is not an error.
/// Deliveries may take arbitrarily long; the pipeline only ever calls a sink
/// from the emitter actor, never while holding a queue lock.
pub trait EventSink: Send + Sync + 'static {
    /// Deliver to the subscriber identified by `scope_key` only.
    fn emit_scoped<'a>(
        &'a self,
        scope_key: &'a str,
        event: &'a str,
        payload: serde_json::Value,
    ) -> SinkFuture<'a>;

    /// Deliver to every subscriber.
    fn emit_broadcast<'a>(&'a self, event: &'a str, payload: serde_json::Value)
    -> SinkFuture<'a>;

    /// Whether a subscriber for `scope_key` is currently connected.
    fn is_reachable(&self, scope_key: &str) -> bool;

    /// Number of connected subscribers.
    fn reachable_count(&self) -> usize;
}

/// Sink with one unbounded channel per connected session.
///
/// A transport registers a session with [`SessionHub::connect`] and forwards
/// whatever arrives on the returned receiver to its client.
#[derive(Default)]
pub struct SessionHub {
    sessions: RwLock<HashMap<String, mpsc::UnboundedSender<WireMessage>>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Reconnecting replaces the previous channel.
    pub fn connect(&self, session: impl Into<String>) -> mpsc::UnboundedReceiver<WireMessage> {
        let session = session.into();
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::debug!(session = %session, "Session connected");
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, tx);
        rx
    }

    /// Drop a session. Returns whether it was registered.
    pub fn disconnect(&self, session: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session)
            .is_some();
        if removed {
            tracing::debug!(session = %session, "Session disconnected");
        }
        removed
    }

    fn send_to(&self, session: &str, message: WireMessage) {
        let closed = {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            match sessions.get(session) {
                Some(tx) => tx.send(message).is_err(),
                None => {
                    tracing::debug!(session = %session, event = %message.event, "No subscriber for scoped event");
                    false
                }
            }
        };
        if closed {
            self.disconnect(session);
        }
    }

    fn send_all(&self, message: WireMessage) {
        let closed: Vec<String> = {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            sessions
                .iter()
                .filter(|(_, tx)| tx.send(message.clone()).is_err())
                .map(|(session, _)| session.clone())
                .collect()
        };
        for session in closed {
            self.disconnect(&session);
        }
    }
}

impl EventSink for SessionHub {
    fn emit_scoped<'a>(
        &'a self,
        scope_key: &'a str,
        event: &'a str,
        payload: serde_json::Value,
    ) -> SinkFuture<'a> {
        Box::pin(async move {
            self.send_to(scope_key, WireMessage::new(event, payload));
        })
    }

    fn emit_broadcast<'a>(
        &'a self,
        event: &'a str,
        payload: serde_json::Value,
    ) -> SinkFuture<'a> {
        Box::pin(async move {
            self.send_all(WireMessage::new(event, payload));
        })
    }

    fn is_reachable(&self, scope_key: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope_key)
            .is_some_and(|tx| !tx.is_closed())
    }

    fn reachable_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}
