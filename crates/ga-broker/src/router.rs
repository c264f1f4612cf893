//! Per-frame message routing.
//!
//! Order of checks: decode, then `session` (builtin, always wins), then
//! `command`, else invalid shape. Every failure is contained here: it is
//! logged and counted, and the connection keeps going with no reply.

use std::any::Any;
use std::sync::Arc;

use ga_core::wire::{self, Inbound};
use ga_core::{ConnectionId, RouteError};
use metrics::counter;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::broker::Broker;
use crate::commands::Responder;
use crate::connection::Connection;
use crate::metrics::{ROUTER_ERRORS_TOTAL, ROUTER_MESSAGES_TOTAL};

/// Longest slice of a rejected frame kept in logs.
const LOGGED_FRAME_LIMIT: usize = 256;

impl<S> Broker<S>
where
    S: Send + Sync + 'static,
{
    /// Route one inbound text frame from `id`.
    ///
    /// Returns once the frame is fully handled, including any command
    /// handler it triggered, so awaiting this per frame keeps a
    /// connection's messages in arrival order.
    pub async fn on_message(&self, id: &ConnectionId, text: &str) {
        let Some(conn) = self.connections.get(id) else {
            warn!(conn_id = %id, "message for unknown connection dropped");
            return;
        };
        let seq = conn.record_message();
        counter!(ROUTER_MESSAGES_TOTAL).increment(1);

        if let Err(err) = self.route(&conn, text).await {
            report(&conn, seq, text, &err);
        }
    }

    async fn route(&self, conn: &Arc<Connection>, text: &str) -> Result<(), RouteError> {
        match wire::decode(text)? {
            Inbound::Session { op, name } => {
                debug!(conn_id = %conn.id(), op = op.as_str(), "builtin");
                self.handle_session_op(conn, op, name)
            }
            Inbound::Command { name, payload } => self.dispatch(conn, name, payload).await,
        }
    }

    async fn dispatch(
        &self,
        conn: &Arc<Connection>,
        command: String,
        payload: Value,
    ) -> Result<(), RouteError> {
        let Some(session_name) = conn.session() else {
            return Err(RouteError::NoSession { command });
        };
        if !self.commands.contains(&command) {
            return Err(RouteError::CommandNotFound(command));
        }
        let Some(session) = self.sessions.get(&session_name) else {
            return Err(RouteError::SessionNotFound(session_name));
        };

        debug!(conn_id = %conn.id(), session = %session_name, command = %command, "dispatch");
        let commands = Arc::clone(&self.commands);
        let out = Responder::new(Arc::clone(&self.connections), Arc::clone(conn), session_name);
        let name = command.clone();
        let joined = tokio::task::spawn_blocking(move || {
            commands.invoke(&name, session.state(), &payload, &out)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => Err(RouteError::HandlerPanicked {
                command,
                message: panic_message(join_err.into_panic()),
            }),
            Err(_) => Err(RouteError::Handler {
                command,
                source: ga_core::CommandError::Internal("handler task cancelled".into()),
            }),
        }
    }
}

fn report(conn: &Connection, seq: u64, text: &str, err: &RouteError) {
    let kind = err.kind();
    counter!(ROUTER_ERRORS_TOTAL, "kind" => kind).increment(1);
    let frame = truncate(text, LOGGED_FRAME_LIMIT);
    if err.is_handler_fault() {
        error!(conn_id = %conn.id(), seq, kind, frame, error = %err, "command failed");
    } else {
        warn!(conn_id = %conn.id(), seq, kind, frame, error = %err, "frame dropped");
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}
