//! AT protocol framing.
//!
//! Every exchange looks like this on the wire:
//!
//! ```text
//! -> AT+CSQ\r\n
//! <- AT+CSQ\r\n          echo
//! <- +CSQ: 20,0\r\n      payload (optional)
//! <- OK\r\n              final result: OK, ERROR or NO CARRIER
//! ```
//!
//! Lines arriving while no command is outstanding are unsolicited result
//! codes and go to the [`crate::sink::NotificationSink`].

mod accumulator;
mod engine;

pub use accumulator::LineAccumulator;
pub use engine::ProtocolEngine;

use crate::error::{ModemError, ModemResult};
use serde::{Deserialize, Serialize};

/// Where the engine is in the current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    /// No command outstanding, or the echo of the last one not seen yet.
    #[default]
    Idle,
    /// Echo seen; looking for the final result line.
    AwaitingResult,
}

/// Outcome of the most recent command, as reported by `poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// No final result line yet.
    Pending,
    /// `OK`
    Ok,
    /// `ERROR`
    Error,
    /// `NO CARRIER`
    NoCarrier,
}

/// Final result lines, in the order they are checked.
const FINAL_RESULTS: [ResultCode; 3] = [ResultCode::Ok, ResultCode::Error, ResultCode::NoCarrier];

impl ResultCode {
    /// The line that ends a response with this result.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Self::Pending => None,
            Self::Ok => Some("OK"),
            Self::Error => Some("ERROR"),
            Self::NoCarrier => Some("NO CARRIER"),
        }
    }

    /// Recognize a trimmed line as a final result.
    pub fn from_final_line(line: &str) -> Option<Self> {
        FINAL_RESULTS
            .into_iter()
            .find(|code| code.marker() == Some(line))
    }

    /// Whether a final result has been received.
    pub fn is_complete(self) -> bool {
        self != Self::Pending
    }

    /// Map a completed result onto the session error taxonomy.
    ///
    /// `Pending` is not an outcome and maps to [`ModemError::Incomplete`].
    /// The session's wait loop only converts completed results; a real
    /// timeout is reported as [`ModemError::Timeout`] with its bound.
    pub fn into_result(self) -> ModemResult<()> {
        match self {
            Self::Ok => Ok(()),
            Self::Error => Err(ModemError::DeviceError),
            Self::NoCarrier => Err(ModemError::LinkLost),
            Self::Pending => Err(ModemError::Incomplete),
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker().unwrap_or("PENDING"))
    }
}

/// How the engine recognizes the echo of a command it just sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "prefix")]
pub enum EchoMatch {
    /// The line must equal the command text passed to `send`.
    Exact,
    /// Any line starting with this prefix counts as an echo, whether or not
    /// a command is outstanding.
    Prefix(String),
}

impl Default for EchoMatch {
    fn default() -> Self {
        Self::Exact
    }
}
