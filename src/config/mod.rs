//! Session configuration
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::serial::interface::{BAUD_RATE, DEFAULT_PORT};

// The RAK811 typically answers in under 1.5 seconds
pub const RESPONSE_TIMEOUT_MS: u64 = 5_000;
// Duty cycle limits can hold events back for minutes at high SF
pub const EVENT_TIMEOUT_MS: u64 = 5 * 60 * 1_000;
pub const JOIN_TIMEOUT_MS: u64 = 30_000;
// Only bounds how long close() waits for the reader to notice
pub const READ_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Reader task poll window
    pub read_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub event_timeout_ms: u64,
    pub join_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: BAUD_RATE,
            read_timeout_ms: READ_TIMEOUT_MS,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            event_timeout_ms: EVENT_TIMEOUT_MS,
            join_timeout_ms: JOIN_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    pub fn with_port(port: &str) -> Self {
        Self { port: port.to_string(), ..Self::default() }
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid session configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port.is_empty() {
            anyhow::bail!("port must not be empty");
        }
        if self.baud_rate == 0 {
            anyhow::bail!("baud_rate must be non-zero");
        }
        if self.read_timeout_ms == 0 {
            anyhow::bail!("read_timeout_ms must be non-zero");
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.port, "/dev/serial0");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.response_timeout(), Duration::from_secs(5));
        assert_eq!(config.event_timeout(), Duration::from_secs(300));
        assert_eq!(config.join_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SessionConfig::from_json_str(r#"{"port": "/dev/ttyUSB0", "event_timeout_ms": 10000}"#).unwrap();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.event_timeout(), Duration::from_secs(10));
        assert_eq!(config.baud_rate, 115200);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(SessionConfig::from_json_str(r#"{"baud_rate": 0}"#).is_err());
        assert!(SessionConfig::from_json_str(r#"{"port": ""}"#).is_err());
        assert!(SessionConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SessionConfig::load("/nonexistent/rak811.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rak811.json"));
    }
}
