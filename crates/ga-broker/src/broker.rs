//! The broker: owns both registries and the command table.
//!
//! The transport layer drives it through three hooks:
//! [`Broker::on_connect`], [`Broker::on_message`] and [`Broker::on_close`].
//! Each instance is fully independent; there is no global state.

use std::sync::Arc;

use ga_core::ConnectionId;
use tokio::sync::mpsc;
use tracing::info;

use crate::commands::CommandTable;
use crate::connection::Connection;
use crate::registry::{ConnectionRegistry, SessionRegistry, StateFactory};

/// Static metadata returned by the `describe` builtin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInfo {
    /// Human-readable title.
    pub title: String,
    /// Identifies the command set clients should expect.
    pub command_protocol: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            title: "Generic Genetic Algorithm".into(),
            command_protocol: "generic".into(),
        }
    }
}

/// Session/connection broker over application state `S`.
pub struct Broker<S> {
    pub(crate) connections: Arc<ConnectionRegistry>,
    pub(crate) sessions: Arc<SessionRegistry<S>>,
    pub(crate) commands: Arc<CommandTable<S>>,
    pub(crate) info: ServerInfo,
}

impl<S> Broker<S>
where
    S: Send + Sync + 'static,
{
    /// Build a broker whose sessions get state from `factory`.
    pub fn new<F>(factory: F, commands: CommandTable<S>, info: ServerInfo) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        let factory: StateFactory<S> = Arc::new(factory);
        Self {
            connections: Arc::new(ConnectionRegistry::new()),
            sessions: Arc::new(SessionRegistry::new(factory)),
            commands: Arc::new(commands),
            info,
        }
    }

    /// Register a freshly accepted connection.
    pub fn on_connect(&self, id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Arc<Connection> {
        let connection = Arc::new(Connection::new(id, tx));
        let _ = self.connections.register(Arc::clone(&connection));
        info!(conn_id = %connection.id(), live = self.connections.len(), "connected");
        connection
    }

    /// Forget a closed connection. Its session, if any, is left alone.
    pub fn on_close(&self, id: &ConnectionId) {
        if let Some(connection) = self.connections.unregister(id) {
            info!(
                conn_id = %id,
                session = connection.session().as_deref().unwrap_or("-"),
                messages = connection.message_count(),
                dropped = connection.drop_count(),
                age_secs = connection.age().as_secs(),
                "disconnected"
            );
        }
    }

    /// Live connections.
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Named sessions.
    pub fn sessions(&self) -> &Arc<SessionRegistry<S>> {
        &self.sessions
    }

    /// Registered commands.
    pub fn commands(&self) -> &Arc<CommandTable<S>> {
        &self.commands
    }

    /// `describe` metadata.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::commands::Responder;
    use ga_core::CommandError;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicU64, Ordering};

    pub(crate) struct Client {
        pub(crate) id: ConnectionId,
        pub(crate) rx: mpsc::Receiver<Arc<String>>,
    }

    impl Client {
        pub(crate) fn next(&mut self) -> Option<Value> {
            self.rx
                .try_recv()
                .ok()
                .map(|s| serde_json::from_str(&s).unwrap())
        }

        pub(crate) fn drain(&mut self) -> Vec<Value> {
            std::iter::from_fn(|| self.next()).collect()
        }
    }

    pub(crate) fn counter_table() -> CommandTable<AtomicU64> {
        let mut table = CommandTable::new();
        let _ = table
            .register(
                "incr",
                |state: &AtomicU64, _: &Value, out: &Responder| -> Result<(), CommandError> {
                    let n = state.fetch_add(1, Ordering::SeqCst) + 1;
                    let _ = out.broadcast(&json!({"info": "count", "data": n}));
                    Ok(())
                },
            )
            .register(
                "get",
                |state: &AtomicU64, _: &Value, out: &Responder| -> Result<(), CommandError> {
                    let _ = out.reply(&json!({"info": "count", "data": state.load(Ordering::SeqCst)}));
                    Ok(())
                },
            )
            .register(
                "boom",
                |_: &AtomicU64, _: &Value, _: &Responder| -> Result<(), CommandError> {
                    panic!("handler exploded")
                },
            )
            .register(
                "reject",
                |_: &AtomicU64, _: &Value, _: &Responder| -> Result<(), CommandError> {
                    Err(CommandError::Rejected("nope".into()))
                },
            );
        table
    }

    pub(crate) fn counter_broker() -> Broker<AtomicU64> {
        Broker::new(|| AtomicU64::new(0), counter_table(), ServerInfo::default())
    }

    pub(crate) fn connect<S: Send + Sync + 'static>(broker: &Broker<S>) -> Client {
        let (tx, rx) = mpsc::channel(64);
        let id = ConnectionId::new();
        let _ = broker.on_connect(id.clone(), tx);
        Client { id, rx }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;

    #[test]
    fn connect_and_close_track_registry() {
        let broker = counter_broker();
        let a = connect(&broker);
        let b = connect(&broker);
        assert_eq!(broker.connections().len(), 2);

        broker.on_close(&a.id);
        assert_eq!(broker.connections().len(), 1);
        assert!(broker.connections().get(&b.id).is_some());

        // closing twice is harmless
        broker.on_close(&a.id);
        assert_eq!(broker.connections().len(), 1);
    }

    #[test]
    fn brokers_are_independent() {
        let one = counter_broker();
        let two = counter_broker();
        let _ = connect(&one);
        let _ = one.sessions().get_or_create("s1");
        assert_eq!(two.connections().len(), 0);
        assert!(two.sessions().is_empty());
    }

    #[test]
    fn info_defaults() {
        let broker = counter_broker();
        assert_eq!(broker.info().title, "Generic Genetic Algorithm");
        assert_eq!(broker.info().command_protocol, "generic");
        assert_eq!(broker.commands().commands(), ["boom", "get", "incr", "reject"]);
    }
}
