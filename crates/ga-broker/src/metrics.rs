//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// WebSocket connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Live WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Upgrades refused at the connection limit (counter).
pub const WS_CONNECTIONS_REJECTED_TOTAL: &str = "ws_connections_rejected_total";
/// Connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Inbound frames routed (counter).
pub const ROUTER_MESSAGES_TOTAL: &str = "router_messages_total";
/// Frames dropped by the router (counter, labels: kind).
pub const ROUTER_ERRORS_TOTAL: &str = "router_errors_total";
/// Command invocations (counter, labels: command).
pub const COMMANDS_TOTAL: &str = "commands_total";
/// Command duration (histogram, labels: command).
pub const COMMAND_DURATION_SECONDS: &str = "command_duration_seconds";
/// Recipients per broadcast (histogram).
pub const BROADCAST_RECIPIENTS: &str = "broadcast_recipients";
/// Outbound messages dropped on a full or closed queue (counter).
pub const SEND_DROPS_TOTAL: &str = "send_drops_total";
/// Sessions created (counter).
pub const SESSIONS_CREATED_TOTAL: &str = "sessions_created_total";
/// Sessions deleted (counter).
pub const SESSIONS_DELETED_TOTAL: &str = "sessions_deleted_total";
/// Live sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "sessions_active";
