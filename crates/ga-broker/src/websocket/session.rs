//! Socket lifecycle, from upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use ga_core::ConnectionId;
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::broker::Broker;
use crate::config::ServerConfig;
use crate::metrics::{
    ROUTER_ERRORS_TOTAL, WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE,
    WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};

/// Per-socket tunables.
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    /// Outbound queue length.
    pub queue_capacity: usize,
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// Silence tolerated before the peer is dropped.
    pub pong_timeout: Duration,
}

impl From<&ServerConfig> for SessionOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            queue_capacity: config.send_queue_capacity.max(1),
            ping_interval: config.heartbeat_interval(),
            pong_timeout: config.heartbeat_timeout(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Drive one accepted socket until it closes or `shutdown` fires.
///
/// Inbound text frames are handed to [`Broker::on_message`] one at a time,
/// so a connection's messages are handled in arrival order. Outbound frames
/// come from the connection's queue and are written by a separate task that
/// also sends pings.
#[instrument(skip_all, fields(conn_id))]
pub async fn run_ws_session<S>(
    ws: WebSocket,
    broker: Arc<Broker<S>>,
    options: SessionOptions,
    shutdown: CancellationToken,
) where
    S: Send + Sync + 'static,
{
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(options.queue_capacity);

    let id = ConnectionId::new();
    let _ = tracing::Span::current().record("conn_id", id.as_str());
    let connection = broker.on_connect(id.clone(), send_tx);
    let started = Instant::now();
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // cancelled when either half stops, so the other follows
    let closing = shutdown.child_token();

    let outbound_conn = Arc::clone(&connection);
    let outbound_closing = closing.clone();
    let outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(options.ping_interval);
        // skip the immediate first tick
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                () = outbound_closing.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    let text = Arc::unwrap_or_clone(text);
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > options.pong_timeout
                    {
                        warn!(
                            conn_id = %outbound_conn.id(),
                            timeout_secs = options.pong_timeout.as_secs(),
                            "peer unresponsive, disconnecting"
                        );
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        outbound_closing.cancel();
    });

    loop {
        let frame = tokio::select! {
            () = closing.cancelled() => break,
            frame = ws_rx.next() => frame,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(conn_id = %id, error = %e, "socket read failed");
                break;
            }
            None => break,
        };

        match msg {
            Message::Text(text) => broker.on_message(&id, text.as_str()).await,
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => broker.on_message(&id, text).await,
                Err(_) => {
                    counter!(ROUTER_ERRORS_TOTAL, "kind" => "invalid_payload").increment(1);
                    warn!(conn_id = %id, len = data.len(), "non-UTF-8 binary frame dropped");
                }
            },
            Message::Close(_) => {
                debug!(conn_id = %id, "peer sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => connection.mark_alive(),
        }
    }

    closing.cancel();
    // give the writer a moment to flush the close frame
    if tokio::time::timeout(Duration::from_secs(1), outbound).await.is_err() {
        debug!(conn_id = %id, "writer did not stop in time");
    }

    broker.on_close(&id);
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    info!(conn_id = %id, "socket closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let config = ServerConfig {
            send_queue_capacity: 8,
            heartbeat_interval_secs: 2,
            heartbeat_timeout_secs: 6,
            ..ServerConfig::default()
        };
        let options = SessionOptions::from(&config);
        assert_eq!(options.queue_capacity, 8);
        assert_eq!(options.ping_interval, Duration::from_secs(2));
        assert_eq!(options.pong_timeout, Duration::from_secs(6));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let config = ServerConfig {
            send_queue_capacity: 0,
            ..ServerConfig::default()
        };
        assert_eq!(SessionOptions::from(&config).queue_capacity, 1);
    }

    #[test]
    fn default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.queue_capacity, 1024);
        assert_eq!(options.ping_interval, Duration::from_secs(30));
        assert_eq!(options.pong_timeout, Duration::from_secs(90));
    }
}
