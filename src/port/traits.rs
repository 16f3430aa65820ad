//! Core traits for the byte transport underneath the AT protocol.
//!
//! Defines the `Transport` trait that allows both real serial ports and mock
//! implementations to be driven by the same session.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line terminator used on the wire in both directions.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Framing parameters for a serial port. The baud rate is supplied separately
/// when the transport is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Timeout for individual read/write system calls.
    pub io_timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            io_timeout: Duration::from_millis(10),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// A character-oriented byte channel to the device.
///
/// Reads are strictly non-blocking: callers ask how many bytes are
/// available and only then read them, one at a time.
pub trait Transport: Send + std::fmt::Debug {
    /// Open the channel at the given signaling rate.
    fn begin(&mut self, baud_rate: u32) -> Result<(), PortError>;

    /// Close the channel. Closing an already closed transport is a no-op.
    fn end(&mut self);

    /// Write bytes to the channel.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Block until every written byte has left the transmit buffer.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> Result<usize, PortError>;

    /// Read one received byte, or `None` if nothing is buffered.
    fn read_byte(&mut self) -> Result<Option<u8>, PortError>;

    /// Get the name/path of this transport.
    fn name(&self) -> &str;

    /// Write every byte of `data`, retrying partial writes.
    fn write_all(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            let written = self.write_bytes(data)?;
            if written == 0 {
                return Err(PortError::Io(std::io::Error::from(
                    std::io::ErrorKind::WriteZero,
                )));
            }
            data = &data[written..];
        }
        Ok(())
    }

    /// Write `line` followed by the `\r\n` terminator.
    fn write_line(&mut self, line: &str) -> Result<(), PortError> {
        self.write_all(line.as_bytes())?;
        self.write_all(LINE_TERMINATOR)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn begin(&mut self, baud_rate: u32) -> Result<(), PortError> {
        (**self).begin(baud_rate)
    }

    fn end(&mut self) {
        (**self).end()
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        (**self).write_bytes(data)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        (**self).flush()
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>, PortError> {
        (**self).read_byte()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
