//! `GaServer`: Axum HTTP + WebSocket front end for a [`Broker`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::broker::Broker;
use crate::commands::CommandTable;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::{SessionOptions, run_ws_session};

/// Errors from binding or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Socket bind or accept failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state accessible from Axum handlers.
pub struct AppState<S> {
    /// The broker every socket talks to.
    pub broker: Arc<Broker<S>>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle, if metrics are installed.
    pub metrics: Option<PrometheusHandle>,
    /// Active configuration.
    pub config: Arc<ServerConfig>,
    /// One permit per allowed socket, held from upgrade until close.
    pub slots: Arc<Semaphore>,
}

// derive would demand `S: Clone`
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            broker: Arc::clone(&self.broker),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            config: Arc::clone(&self.config),
            slots: Arc::clone(&self.slots),
        }
    }
}

/// The GA broker server.
pub struct GaServer<S> {
    config: Arc<ServerConfig>,
    broker: Arc<Broker<S>>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
    slots: Arc<Semaphore>,
}

impl<S> GaServer<S>
where
    S: Send + Sync + 'static,
{
    /// Create a server whose sessions get state from `factory`.
    pub fn new<F>(config: ServerConfig, factory: F, commands: CommandTable<S>) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        let broker = Broker::new(factory, commands, config.server_info());
        let slots = Arc::new(Semaphore::new(config.max_connections.min(Semaphore::MAX_PERMITS)));
        Self {
            config: Arc::new(config),
            broker: Arc::new(broker),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: None,
            start_time: Instant::now(),
            slots,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            broker: Arc::clone(&self.broker),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            config: Arc::clone(&self.config),
            slots: Arc::clone(&self.slots),
        };

        Router::new()
            .route("/ws", get(ws_handler::<S>))
            .route("/health", get(health_handler::<S>))
            .route("/metrics", get(metrics_handler::<S>))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve in the background.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task,
    /// which ends once [`ShutdownCoordinator::shutdown`] fires.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener =
            TcpListener::bind(format!("{}:{}", self.config.host, self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, title = %self.config.title, "listening");

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "server stopped with error");
            }
        });
        Ok((addr, handle))
    }

    /// The broker behind every socket.
    pub fn broker(&self) -> &Arc<Broker<S>> {
        &self.broker
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Sockets that may still be accepted before the limit is reached.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// GET /ws
async fn ws_handler<S>(State(state): State<AppState<S>>, ws: WebSocketUpgrade) -> Response
where
    S: Send + Sync + 'static,
{
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    // held until the socket closes; a handshake in flight already counts
    let Ok(slot) = Arc::clone(&state.slots).try_acquire_owned() else {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(
            live = state.broker.connections().len(),
            max = state.config.max_connections,
            "connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    let options = SessionOptions::from(state.config.as_ref());
    let token = state.shutdown.token();
    let broker = state.broker;
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            run_ws_session(socket, broker, options, token).await;
            drop(slot);
        })
}

/// GET /health
async fn health_handler<S>(State(state): State<AppState<S>>) -> Json<HealthResponse>
where
    S: Send + Sync + 'static,
{
    Json(health::health_check(
        state.start_time,
        state.broker.connections().len(),
        state.broker.sessions().len(),
    ))
}

/// GET /metrics
async fn metrics_handler<S>(State(state): State<AppState<S>>) -> Response
where
    S: Send + Sync + 'static,
{
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
