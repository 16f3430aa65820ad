use crate::port::PortError;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for session operations.
pub type ModemResult<T> = Result<T, ModemError>;

/// Outcomes of a command exchange other than `OK`.
///
/// The protocol engine never produces these itself; the session maps the
/// engine's observable state onto them so callers can use `?`.
#[derive(Debug, Error)]
pub enum ModemError {
    /// No final result line arrived within the bound.
    #[error("No final result within {0:?}")]
    Timeout(Duration),

    /// The device answered `ERROR`.
    #[error("Device reported ERROR")]
    DeviceError,

    /// The device answered `NO CARRIER`.
    #[error("Device reported NO CARRIER")]
    LinkLost,

    /// The transport could not be opened.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(#[source] PortError),

    /// The transport failed while open.
    #[error("Transport error: {0}")]
    Transport(#[from] PortError),

    /// Auto-detection gave up without a single `OK`.
    #[error("No response from device within {0:?}")]
    NotDetected(Duration),

    /// A result was read before the device sent a final line.
    #[error("Command has no final result yet")]
    Incomplete,

    /// The session has not been opened.
    #[error("Session is not open")]
    NotOpen,
}

impl ModemError {
    /// Whether retrying the same command could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::NotDetected(_))
    }
}
