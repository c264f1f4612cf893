//! Output capabilities handed to a command handler.

use std::sync::Arc;

use ga_core::ConnectionId;
use serde_json::Value;
use tracing::debug;

use crate::connection::Connection;
use crate::registry::ConnectionRegistry;

/// Reply and broadcast, bound to the invoking connection and its session.
///
/// Both are best effort: a closed or saturated peer is skipped, never
/// waited on.
#[derive(Clone)]
pub struct Responder {
    connections: Arc<ConnectionRegistry>,
    origin: Arc<Connection>,
    session: String,
}

impl Responder {
    /// Bind to `origin` and the session it was in when the command arrived.
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        origin: Arc<Connection>,
        session: String,
    ) -> Self {
        Self {
            connections,
            origin,
            session,
        }
    }

    /// Deliver `message` to every connection currently bound to the session,
    /// the invoker included. Returns the number of successful sends.
    pub fn broadcast(&self, message: &Value) -> usize {
        self.connections.broadcast_to_session(&self.session, message)
    }

    /// Deliver `message` to the invoking connection only.
    pub fn reply(&self, message: &Value) -> bool {
        let sent = self.origin.send_json(message);
        if !sent {
            debug!(conn_id = %self.origin.id(), "reply dropped, connection gone or saturated");
        }
        sent
    }

    /// Session the command runs against.
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Id of the invoking connection.
    pub fn origin(&self) -> &ConnectionId {
        self.origin.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn reply_goes_to_origin_only() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = Arc::new(Connection::new(ConnectionId::from("a"), tx_a));
        let b = Arc::new(Connection::new(ConnectionId::from("b"), tx_b));
        let _ = a.bind("s".into());
        let _ = b.bind("s".into());
        let _ = registry.register(Arc::clone(&a));
        let _ = registry.register(b);

        let out = Responder::new(registry, a, "s".into());
        assert!(out.reply(&json!({"info": "settings"})));
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());

        assert_eq!(out.broadcast(&json!({"info": "one-gen"})), 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert_eq!(out.session(), "s");
        assert_eq!(out.origin().as_str(), "a");
    }

    #[test]
    fn reply_to_closed_connection_is_tolerated() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, rx) = mpsc::channel(8);
        let a = Arc::new(Connection::new(ConnectionId::new(), tx));
        drop(rx);
        let out = Responder::new(registry, a, "s".into());
        assert!(!out.reply(&json!({})));
    }
}
