//! AT Modem Driver Library
//!
//! A poll-driven driver for devices that speak the Hayes-style AT command
//! protocol over a serial line: cellular modules, GNSS receivers, radio
//! modems.
//!
//! # Modules
//!
//! - `port`: Byte transport abstraction (`serialport`-backed and mock)
//! - `protocol`: Byte-at-a-time response parser (echo, final result, URCs)
//! - `session`: Command session API (send, poll, wait, probe, open)
//! - `shared`: Lock-protected session handle for multi-threaded callers
//! - `sink`: Notification and raw byte callbacks
//! - `clock`: Time source and wait loop pacing
//! - `config`: Configuration management with TOML support
//! - `error`: Session error type
//! - `logging`: Tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use at_modem::{ConfigLoader, Session, SyncSerialPort, SystemClock};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?.into_config();
//! let port = SyncSerialPort::new("/dev/ttyUSB0", config.serial.port_configuration());
//!
//! let mut modem = Session::from_config(port, SystemClock, &config);
//! modem.open(true)?;
//! println!("{}", modem.command("AT+CGMR")?);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod protocol;
pub mod session;
pub mod shared;
pub mod sink;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, Pacing, SystemClock};
pub use error::{ModemError, ModemResult};
pub use port::{
    DataBits, FlowControl, MockSerialPort, Parity, PortConfiguration, PortError, StopBits,
    SyncSerialPort, Transport,
};
pub use protocol::{EchoMatch, ParseState, ProtocolEngine, ResultCode};
pub use session::{Session, SessionState};
pub use shared::SharedSession;
pub use sink::{ByteObserver, FnObserver, FnSink, NotificationSink, TraceObserver};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
