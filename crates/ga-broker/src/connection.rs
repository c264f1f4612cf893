//! Per-connection state held by the broker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ga_core::ConnectionId;
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::metrics::SEND_DROPS_TOTAL;

/// One accepted transport link plus the session it is bound to.
///
/// The session binding is a name, not a reference: it is looked up in the
/// session registry on every use and may name a session that has since
/// been deleted.
pub struct Connection {
    id: ConnectionId,
    /// Bound session name; only builtin session ops change it.
    session: Mutex<Option<String>>,
    /// Outbound queue drained by the socket's writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was accepted.
    pub connected_at: Instant,
    /// Whether the peer answered since the last heartbeat check.
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    messages: AtomicU64,
    dropped_messages: AtomicU64,
}

impl Connection {
    /// Create an unbound connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            session: Mutex::new(None),
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            messages: AtomicU64::new(0),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Connection id.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Currently bound session name.
    pub fn session(&self) -> Option<String> {
        self.session.lock().clone()
    }

    /// Whether the connection is bound to `name`.
    pub fn is_bound_to(&self, name: &str) -> bool {
        self.session.lock().as_deref() == Some(name)
    }

    /// Bind to `name`, returning the previous binding.
    pub(crate) fn bind(&self, name: String) -> Option<String> {
        self.session.lock().replace(name)
    }

    /// Drop any binding, returning it.
    pub(crate) fn unbind(&self) -> Option<String> {
        self.session.lock().take()
    }

    /// Unbind only if currently bound to `name`.
    pub(crate) fn unbind_if(&self, name: &str) -> bool {
        let mut session = self.session.lock();
        if session.as_deref() == Some(name) {
            *session = None;
            true
        } else {
            false
        }
    }

    /// Queue a text frame without waiting.
    ///
    /// Returns `false` when the queue is full or the socket is gone; the
    /// message is dropped and counted.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            counter!(SEND_DROPS_TOTAL).increment(1);
            debug!(conn_id = %self.id, "send dropped (queue full or closed)");
            false
        }
    }

    /// Serialize and queue a JSON value.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)),
            Err(_) => false,
        }
    }

    /// Messages dropped so far.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Count one inbound frame, returning the new total.
    pub fn record_message(&self) -> u64 {
        self.messages.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Inbound frames seen so far.
    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Mark the peer as alive (pong or any control frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last pong, or since accept.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Read and reset the alive flag.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("session", &self.session())
            .field("messages", &self.message_count())
            .finish_non_exhaustive()
    }
}
