//! Settings types.
//!
//! All structs use `camelCase` on disk and `#[serde(default)]`, so a settings
//! file only needs the keys it overrides.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GaSettings {
    /// Network and broker settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl GaSettings {
    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.server;
        if s.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be at least 1".into(),
            ));
        }
        if s.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be at least 1".into(),
            ));
        }
        if s.heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "server.heartbeatIntervalSecs must be at least 1".into(),
            ));
        }
        if s.heartbeat_timeout_secs < s.heartbeat_interval_secs {
            return Err(SettingsError::InvalidValue(format!(
                "server.heartbeatTimeoutSecs ({}) is shorter than heartbeatIntervalSecs ({})",
                s.heartbeat_timeout_secs, s.heartbeat_interval_secs
            )));
        }
        Ok(())
    }
}

/// Server network and broker settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// WebSocket port.
    pub port: u16,
    /// Title returned by the `describe` builtin.
    pub title: String,
    /// Protocol identifier returned by the `describe` builtin.
    pub command_protocol: String,
    /// Live connections allowed before upgrades are refused.
    pub max_connections: usize,
    /// Outbound messages buffered per connection before sends fail.
    pub send_queue_capacity: usize,
    /// Seconds between server pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a pong before a peer is disconnected.
    pub heartbeat_timeout_secs: u64,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            title: "Generic Genetic Algorithm".to_string(),
            command_protocol: "generic".to_string(),
            max_connections: 256,
            send_queue_capacity: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = GaSettings::default();
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.server.title, "Generic Genetic Algorithm");
        assert_eq!(s.server.command_protocol, "generic");
        assert_eq!(s.server.send_queue_capacity, 1024);
        assert_eq!(s.logging.level, "info");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn camel_case_keys_on_disk() {
        let json = serde_json::to_value(GaSettings::default()).unwrap();
        assert!(json["server"].get("commandProtocol").is_some());
        assert!(json["server"].get("maxConnections").is_some());
        assert!(json["server"].get("command_protocol").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: GaSettings = serde_json::from_str(r#"{"server":{"port":9000}}"#).unwrap();
        assert_eq!(s.server.port, 9000);
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.logging.format, "compact");
    }

    #[test]
    fn validate_rejects_zero_queue() {
        let mut s = GaSettings::default();
        s.server.send_queue_capacity = 0;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("sendQueueCapacity"));
    }

    #[test]
    fn validate_rejects_timeout_below_interval() {
        let mut s = GaSettings::default();
        s.server.heartbeat_interval_secs = 60;
        s.server.heartbeat_timeout_secs = 30;
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_connections() {
        let mut s = GaSettings::default();
        s.server.max_connections = 0;
        assert!(s.validate().is_err());
    }
}
