//! Builtin session ops.
//!
//! Per connection the states are `Unbound` and `Bound(name)`. Only `delete`
//! touches other connections; every other op replies to the requester alone.

use std::sync::Arc;

use ga_core::RouteError;
use ga_core::wire::{self, SessionOp};
use tracing::{debug, info};

use crate::broker::Broker;
use crate::connection::Connection;

impl<S> Broker<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn handle_session_op(
        &self,
        conn: &Arc<Connection>,
        op: SessionOp,
        name: Option<String>,
    ) -> Result<(), RouteError> {
        match op {
            SessionOp::JoinOrCreate => {
                match name.filter(|n| !n.is_empty()) {
                    Some(name) => self.join(conn, name),
                    None => debug!(conn_id = %conn.id(), "join-or-create without a name ignored"),
                }
                Ok(())
            }
            SessionOp::Leave => {
                if let Some(previous) = conn.unbind() {
                    debug!(conn_id = %conn.id(), session = %previous, "left session");
                }
                let _ = conn.send_json(&wire::session_info(None));
                Ok(())
            }
            SessionOp::Delete => {
                match conn.session() {
                    Some(name) => self.delete_session(conn, &name),
                    None => debug!(conn_id = %conn.id(), "delete while unbound ignored"),
                }
                Ok(())
            }
            SessionOp::List => {
                let _ = conn.send_json(&wire::session_list(self.sessions.list_names()));
                Ok(())
            }
            SessionOp::Info => {
                let _ = conn.send_json(&wire::session_info(conn.session().as_deref()));
                Ok(())
            }
            SessionOp::Describe => {
                let _ = conn.send_json(&wire::session_describe(
                    &self.info.title,
                    &self.info.command_protocol,
                ));
                Ok(())
            }
            SessionOp::Unknown(op) => Err(RouteError::UnknownBuiltin(op)),
        }
    }

    /// Bind `conn` to `name`, creating the session if needed.
    fn join(&self, conn: &Arc<Connection>, name: String) {
        // the read lock orders this against a concurrent delete of the same name
        let created = {
            let _connections = self.connections.read();
            let (_, created) = self.sessions.get_or_create(&name);
            let _ = conn.bind(name.clone());
            created
        };
        debug!(conn_id = %conn.id(), session = %name, created, "joined session");
        let _ = conn.send_json(&wire::session_info(Some(&name)));
    }

    /// Remove `name` and unbind every connection in it, then notify them.
    fn delete_session(&self, requester: &Arc<Connection>, name: &str) {
        let unbound: Vec<Arc<Connection>> = {
            let connections = self.connections.write();
            let _ = self.sessions.delete(name);
            connections
                .values()
                .filter(|c| c.unbind_if(name))
                .cloned()
                .collect()
        };

        info!(
            session = name,
            requested_by = %requester.id(),
            unbound = unbound.len(),
            "session removed, members unbound"
        );
        let notice = wire::session_info(None);
        for conn in &unbound {
            let _ = conn.send_json(&notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::broker::test_support::*;
    use serde_json::json;

    #[tokio::test]
    async fn join_replies_and_binds() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        broker
            .on_message(&a.id, r#"{"session":"join-or-create","name":"s1"}"#)
            .await;
        assert_eq!(a.next(), Some(json!({"info":"session","session":"s1"})));
        assert_eq!(broker.sessions().list_names(), ["s1"]);
        let conn = broker.connections().get(&a.id).unwrap();
        assert_eq!(conn.session().as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn join_empty_name_is_noop() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        broker.on_message(&a.id, r#"{"session":"join-or-create","name":""}"#).await;
        broker.on_message(&a.id, r#"{"session":"join-or-create"}"#).await;
        assert!(a.drain().is_empty());
        assert!(broker.sessions().is_empty());
    }

    #[tokio::test]
    async fn join_moves_between_sessions() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        broker.on_message(&a.id, r#"{"session":"join-or-create","name":"s1"}"#).await;
        broker.on_message(&a.id, r#"{"session":"join-or-create","name":"s2"}"#).await;
        let replies = a.drain();
        assert_eq!(replies[1], json!({"info":"session","session":"s2"}));
        // the old session survives
        assert_eq!(broker.sessions().list_names(), ["s1", "s2"]);
    }

    #[tokio::test]
    async fn leave_always_replies_null() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        broker.on_message(&a.id, r#"{"session":"leave"}"#).await;
        assert_eq!(a.next(), Some(json!({"info":"session","session":null})));

        broker.on_message(&a.id, r#"{"session":"join-or-create","name":"s1"}"#).await;
        broker.on_message(&a.id, r#"{"session":"leave"}"#).await;
        let replies = a.drain();
        assert_eq!(replies.last(), Some(&json!({"info":"session","session":null})));
        assert_eq!(broker.sessions().list_names(), ["s1"]);
    }

    #[tokio::test]
    async fn info_reports_own_session() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        broker.on_message(&a.id, r#"{"session":"info"}"#).await;
        assert_eq!(a.next(), Some(json!({"info":"session","session":null})));
        broker.on_message(&a.id, r#"{"session":"join-or-create","name":"x"}"#).await;
        let _ = a.drain();
        broker.on_message(&a.id, r#"{"session":"info"}"#).await;
        assert_eq!(a.next(), Some(json!({"info":"session","session":"x"})));
    }

    #[tokio::test]
    async fn list_and_describe_reply_to_requester_only() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        let mut b = connect(&broker);
        broker.on_message(&a.id, r#"{"session":"join-or-create","name":"s1"}"#).await;
        broker.on_message(&b.id, r#"{"session":"join-or-create","name":"s1"}"#).await;
        let _ = (a.drain(), b.drain());

        broker.on_message(&a.id, r#"{"session":"list"}"#).await;
        broker.on_message(&a.id, r#"{"session":"describe"}"#).await;
        assert_eq!(
            a.drain(),
            [
                json!({"info":"session_list","sessions":["s1"]}),
                json!({"info":"session_describe","title":"Generic Genetic Algorithm","command_protocol":"generic"}),
            ]
        );
        assert!(b.drain().is_empty());
    }

    #[tokio::test]
    async fn delete_unbinds_and_notifies_all_members() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        let mut b = connect(&broker);
        let mut c = connect(&broker);
        let mut other = connect(&broker);
        for client in [&a, &b, &c] {
            broker.on_message(&client.id, r#"{"session":"join-or-create","name":"s1"}"#).await;
        }
        broker.on_message(&other.id, r#"{"session":"join-or-create","name":"s2"}"#).await;
        let _ = (a.drain(), b.drain(), c.drain(), other.drain());

        broker.on_message(&a.id, r#"{"session":"delete"}"#).await;
        let null = json!({"info":"session","session":null});
        assert_eq!(a.drain(), [null.clone()]);
        assert_eq!(b.drain(), [null.clone()]);
        assert_eq!(c.drain(), [null.clone()]);
        assert!(other.drain().is_empty());

        for client in [&mut a, &mut b, &mut c] {
            broker.on_message(&client.id, r#"{"session":"info"}"#).await;
            assert_eq!(client.next(), Some(null.clone()));
        }
        broker.on_message(&a.id, r#"{"session":"list"}"#).await;
        assert_eq!(a.next(), Some(json!({"info":"session_list","sessions":["s2"]})));
    }

    #[tokio::test]
    async fn delete_while_unbound_is_noop() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        let _ = broker.sessions().get_or_create("keep");
        broker.on_message(&a.id, r#"{"session":"delete"}"#).await;
        assert!(a.drain().is_empty());
        assert_eq!(broker.sessions().list_names(), ["keep"]);
    }

    #[tokio::test]
    async fn unknown_op_is_silent() {
        let broker = counter_broker();
        let mut a = connect(&broker);
        broker.on_message(&a.id, r#"{"session":"explode"}"#).await;
        assert!(a.drain().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_joins_share_one_session() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::sync::Barrier;

        const JOINERS: usize = 32;

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let broker = Arc::new(crate::broker::Broker::new(
            move || {
                let _ = counted.fetch_add(1, Ordering::SeqCst);
                std::sync::atomic::AtomicU64::new(0)
            },
            counter_table(),
            crate::broker::ServerInfo::default(),
        ));

        let mut clients: Vec<_> = (0..JOINERS).map(|_| connect(&*broker)).collect();
        let start = Arc::new(Barrier::new(JOINERS));
        let tasks: Vec<_> = clients
            .iter()
            .map(|c| {
                let broker = Arc::clone(&broker);
                let start = Arc::clone(&start);
                let id = c.id.clone();
                tokio::spawn(async move {
                    let _ = start.wait().await;
                    broker
                        .on_message(&id, r#"{"session":"join-or-create","name":"race"}"#)
                        .await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(broker.sessions().len(), 1);
        for client in &mut clients {
            assert_eq!(client.next(), Some(json!({"info":"session","session":"race"})));
        }
        assert_eq!(broker.connections().bound_to("race").len(), JOINERS);
    }
}
