//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::clock::Pacing;
use crate::port::{DataBits, FlowControl, Parity, PortConfiguration, StopBits};
use crate::protocol::EchoMatch;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line configuration
    pub serial: SerialConfig,
    /// AT protocol timing and behaviour
    pub protocol: ProtocolConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the session cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::validation(
                "serial.baud_rate",
                "must be greater than zero",
            ));
        }
        if self.protocol.probe_command.trim().is_empty() {
            return Err(ConfigError::validation(
                "protocol.probe_command",
                "must not be empty",
            ));
        }
        if self.protocol.autodetect_interval_ms == 0 {
            return Err(ConfigError::validation(
                "protocol.autodetect_interval_ms",
                "must be greater than zero",
            ));
        }
        if let EchoMatch::Prefix(prefix) = &self.protocol.echo {
            if prefix.is_empty() {
                return Err(ConfigError::validation(
                    "protocol.echo.prefix",
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: Option<String>,
    /// Signaling rate used when the session opens
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Timeout of individual read/write system calls in milliseconds
    pub io_timeout_ms: u64,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            io_timeout_ms: 10,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Framing for [`crate::port::SyncSerialPort`].
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            io_timeout: Duration::from_millis(self.io_timeout_ms),
        }
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// AT protocol section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Liveness probe, normally a bare `AT`
    pub probe_command: String,
    pub probe_timeout_ms: u64,
    /// Command that restarts the modem
    pub reset_command: String,
    pub reset_timeout_ms: u64,
    /// Overall bound for auto-detection
    pub autodetect_timeout_ms: u64,
    /// Pause between auto-detection probes
    pub autodetect_interval_ms: u64,
    /// Default bound for `Session::command`
    pub command_timeout_ms: u64,
    /// What wait loops do between polls
    pub pacing: Pacing,
    /// How command echoes are recognized
    pub echo: EchoMatch,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            probe_command: "AT".to_string(),
            probe_timeout_ms: 100,
            reset_command: "AT+CFUN=16".to_string(),
            reset_timeout_ms: 1000,
            autodetect_timeout_ms: 10_000,
            autodetect_interval_ms: 100,
            command_timeout_ms: 1000,
            pacing: Pacing::default(),
            echo: EchoMatch::default(),
        }
    }
}

impl ProtocolConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn autodetect_timeout(&self) -> Duration {
        Duration::from_millis(self.autodetect_timeout_ms)
    }

    pub fn autodetect_interval(&self) -> Duration {
        Duration::from_millis(self.autodetect_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
    /// Append logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.protocol.probe_command, "AT");
        assert_eq!(config.protocol.probe_timeout(), Duration::from_millis(100));
        assert_eq!(config.protocol.reset_command, "AT+CFUN=16");
        assert_eq!(config.protocol.reset_timeout(), Duration::from_secs(1));
        assert_eq!(config.protocol.autodetect_timeout(), Duration::from_secs(10));
        assert_eq!(config.protocol.echo, EchoMatch::Exact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_alias_resolution() {
        let mut config = SerialConfig::default();
        config
            .port_aliases
            .insert("modem".to_string(), "/dev/ttyACM0".to_string());

        assert_eq!(config.resolve_port("modem"), "/dev/ttyACM0");
        assert_eq!(config.resolve_port("COM5"), "COM5");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("[protocol]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [serial]
            port = "/dev/ttyUSB1"
            baud_rate = 9600
            parity = "even"

            [protocol]
            probe_timeout_ms = 250
            echo = { mode = "prefix", prefix = "AT" }
            pacing = { mode = "yield" }
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.protocol.probe_timeout_ms, 250);
        assert_eq!(config.protocol.echo, EchoMatch::Prefix("AT".to_string()));
        assert_eq!(config.protocol.pacing, Pacing::Yield);
        // Defaults should still work
        assert_eq!(config.protocol.reset_command, "AT+CFUN=16");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { ref key, .. }) if key == "serial.baud_rate"
        ));

        let mut config = Config::default();
        config.protocol.probe_command = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.protocol.echo = EchoMatch::Prefix(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_configuration_mapping() {
        let mut serial = SerialConfig::default();
        serial.stop_bits = StopBits::Two;
        serial.io_timeout_ms = 25;

        let port = serial.port_configuration();
        assert_eq!(port.stop_bits, StopBits::Two);
        assert_eq!(port.io_timeout, Duration::from_millis(25));
    }
}
