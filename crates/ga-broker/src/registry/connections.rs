//! Live connections keyed by id.

use std::collections::HashMap;
use std::sync::Arc;

use ga_core::ConnectionId;
use metrics::histogram;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::metrics::BROADCAST_RECIPIENTS;

pub(crate) type ConnectionMap = HashMap<ConnectionId, Arc<Connection>>;

/// Concurrent map from connection id to [`Connection`].
///
/// Lock order: when both registries are needed this lock is taken first,
/// then the session registry's. No send is ever issued while it is held.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<ConnectionMap>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection, returning any entry it replaced.
    pub fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let id = connection.id().clone();
        let replaced = self.connections.write().insert(id.clone(), connection);
        if replaced.is_some() {
            warn!(conn_id = %id, "connection id registered twice, replacing");
        }
        replaced
    }

    /// Remove a connection.
    pub fn unregister(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.write().remove(id)
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.read().get(id).cloned()
    }

    /// All live connections at this instant.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Call `f` for each connection in a snapshot, with no lock held.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Connection>),
    {
        for connection in self.snapshot() {
            f(&connection);
        }
    }

    /// Connections currently bound to `session`.
    pub fn bound_to(&self, session: &str) -> Vec<Arc<Connection>> {
        self.connections
            .read()
            .values()
            .filter(|c| c.is_bound_to(session))
            .cloned()
            .collect()
    }

    /// Deliver `message` to every connection bound to `session`.
    ///
    /// Serializes once. A failed send to one peer does not stop delivery to
    /// the rest. Returns the number of successful sends.
    pub fn broadcast_to_session(&self, session: &str, message: &Value) -> usize {
        let json = match serde_json::to_string(message) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(session, error = %e, "failed to serialize broadcast");
                return 0;
            }
        };

        let recipients = self.bound_to(session);
        let mut delivered = 0;
        for connection in &recipients {
            if connection.send(Arc::clone(&json)) {
                delivered += 1;
            } else {
                warn!(session, conn_id = %connection.id(), "broadcast send failed");
            }
        }
        #[allow(clippy::cast_precision_loss)]
        histogram!(BROADCAST_RECIPIENTS).record(recipients.len() as f64);
        debug!(session, recipients = recipients.len(), delivered, "broadcast");
        delivered
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no connection is live.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ConnectionMap> {
        self.connections.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ConnectionMap> {
        self.connections.write()
    }
}
