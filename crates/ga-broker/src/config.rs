//! Runtime server configuration.

use std::time::Duration;

use ga_settings::ServerSettings;
use serde::{Deserialize, Serialize};

use crate::broker::ServerInfo;

/// Configuration for [`crate::server::GaServer`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Title returned by `describe`.
    pub title: String,
    /// Protocol identifier returned by `describe`.
    pub command_protocol: String,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Per-connection outbound queue length.
    pub send_queue_capacity: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a pong before disconnecting.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl ServerConfig {
    /// Interval between server pings.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Silence tolerated before a peer is dropped.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Metadata for the `describe` builtin.
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            title: self.title.clone(),
            command_protocol: self.command_protocol.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            title: "Generic Genetic Algorithm".into(),
            command_protocol: "generic".into(),
            max_connections: 256,
            send_queue_capacity: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            title: s.title.clone(),
            command_protocol: s.command_protocol.clone(),
            max_connections: s.max_connections,
            send_queue_capacity: s.send_queue_capacity,
            heartbeat_interval_secs: s.heartbeat_interval_secs,
            heartbeat_timeout_secs: s.heartbeat_timeout_secs,
            max_message_size: s.max_message_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_zero() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.host, "127.0.0.1");
    }

    #[test]
    fn from_settings_copies_every_field() {
        let settings = ServerSettings {
            host: "0.0.0.0".into(),
            port: 9000,
            title: "Rastrigin".into(),
            command_protocol: "ga-v2".into(),
            max_connections: 3,
            send_queue_capacity: 16,
            heartbeat_interval_secs: 5,
            heartbeat_timeout_secs: 15,
            max_message_size: 1024,
        };
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.max_connections, 3);
        assert_eq!(cfg.send_queue_capacity, 16);
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(cfg.heartbeat_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.max_message_size, 1024);
        assert_eq!(
            cfg.server_info(),
            ServerInfo {
                title: "Rastrigin".into(),
                command_protocol: "ga-v2".into(),
            }
        );
    }

    #[test]
    fn zero_interval_is_clamped() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(1));
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"host":"10.0.0.1","port":3000,"title":"t","command_protocol":"p","max_connections":5,"send_queue_capacity":8,"heartbeat_interval_secs":10,"heartbeat_timeout_secs":30,"max_message_size":512}"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.max_connections, 5);
    }
}
