//! Serial port transport.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `Transport`
//! trait. The port is opened lazily by `begin`, so a session can be built
//! before the device is attached.

use super::error::PortError;
use super::traits::{PortConfiguration, Transport};
use std::collections::VecDeque;
use std::io::{Read, Write};

/// Largest single read pulled from the OS into the receive buffer.
const READ_CHUNK: usize = 256;

/// Serial port transport wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port, present between `begin` and `end`.
    port: Option<Box<dyn serialport::SerialPort>>,
    /// The port name/path for identification.
    name: String,
    /// Framing used every time the port is opened.
    config: PortConfiguration,
    /// Bytes already read from the OS but not yet handed out.
    rx: VecDeque<u8>,
}

impl SyncSerialPort {
    /// Create a closed transport for the port at `port_name`.
    ///
    /// # Example
    /// ```no_run
    /// use at_modem::port::{PortConfiguration, SyncSerialPort, Transport};
    ///
    /// let mut port = SyncSerialPort::new("/dev/ttyUSB0", PortConfiguration::default());
    /// port.begin(115_200)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(port_name: impl Into<String>, config: PortConfiguration) -> Self {
        Self {
            port: None,
            name: port_name.into(),
            config,
            rx: VecDeque::with_capacity(READ_CHUNK),
        }
    }

    /// Whether `begin` has succeeded and `end` has not been called since.
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Get a reference to the underlying serialport implementation.
    ///
    /// This can be useful for accessing platform-specific features.
    pub fn as_raw(&self) -> Option<&dyn serialport::SerialPort> {
        self.port.as_deref()
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port.as_mut().ok_or(PortError::NotOpen)
    }
}

impl Transport for SyncSerialPort {
    fn begin(&mut self, baud_rate: u32) -> Result<(), PortError> {
        if baud_rate == 0 {
            return Err(PortError::config("baud rate must be non-zero"));
        }

        let port = serialport::new(&self.name, baud_rate)
            .data_bits(self.config.data_bits.into())
            .flow_control(self.config.flow_control.into())
            .parity(self.config.parity.into())
            .stop_bits(self.config.stop_bits.into())
            .timeout(self.config.io_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(&self.name),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        self.rx.clear();
        self.port = Some(port);
        Ok(())
    }

    fn end(&mut self) {
        self.port = None;
        self.rx.clear();
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port_mut()?.write(data).map_err(PortError::Io)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.port_mut()?.flush().map_err(PortError::Io)
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        if !self.rx.is_empty() {
            return Ok(self.rx.len());
        }
        let pending = self.port_mut()?.bytes_to_read()?;
        Ok(pending as usize)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, PortError> {
        if let Some(byte) = self.rx.pop_front() {
            return Ok(Some(byte));
        }

        let port = self.port_mut()?;
        let pending = (port.bytes_to_read()? as usize).min(READ_CHUNK);
        if pending == 0 {
            return Ok(None);
        }

        let mut chunk = [0u8; READ_CHUNK];
        match port.read(&mut chunk[..pending]) {
            Ok(n) => {
                self.rx.extend(&chunk[..n]);
                Ok(self.rx.pop_front())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field(
                "baud_rate",
                &self.port.as_ref().and_then(|p| p.baud_rate().ok()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_error() {
        let mut port =
            SyncSerialPort::new("/dev/nonexistent_port_12345", PortConfiguration::default());
        let result = port.begin(115_200);

        assert!(result.is_err());
        assert!(!port.is_open());
    }

    #[test]
    fn test_closed_port_rejects_io() {
        let mut port = SyncSerialPort::new("/dev/ttyUSB9", PortConfiguration::default());
        assert!(matches!(port.write_line("AT"), Err(PortError::NotOpen)));
        assert!(matches!(port.bytes_available(), Err(PortError::NotOpen)));
        assert!(matches!(port.read_byte(), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_zero_baud_is_rejected() {
        let mut port = SyncSerialPort::new("/dev/ttyUSB9", PortConfiguration::default());
        assert!(matches!(port.begin(0), Err(PortError::Config(_))));
    }
}
