//! Configuration module for at-modem.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `AT_MODEM_CONFIG` environment variable (explicit path)
//! 2. `./at-modem.toml` (current directory)
//! 3. `at-modem.toml` in the platform config directory
//!    (`~/.config/at-modem/` on Linux, `%APPDATA%\at-modem\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Selected values can be overridden with `AT_MODEM_<SECTION>_<KEY>`:
//! - `AT_MODEM_SERIAL_PORT=/dev/ttyUSB0`
//! - `AT_MODEM_SERIAL_BAUD_RATE=9600`
//! - `AT_MODEM_PROTOCOL_COMMAND_TIMEOUT_MS=5000`
//! - `AT_MODEM_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [protocol]
//! probe_timeout_ms = 100
//! reset_command = "AT+CFUN=16"
//! pacing = { mode = "sleep", interval_ms = 1 }
//! echo = { mode = "exact" }
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, ProtocolConfig, SerialConfig};
