//! Command session: send a command, wait for its final result.
//!
//! # Lifecycle
//!
//! ```text
//! Closed ──open()──> Opening ──autodetect / reset ok──> Ready
//!    ^                  │                                 │
//!    └──── failure ─────┘<─────────── close() ────────────┘
//! ```
//!
//! All waiting is a cooperative loop: poll the transport, check the clock,
//! pause according to [`Pacing`](crate::clock::Pacing), repeat. Nothing
//! blocks on the device, so every outstanding command can time out.

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ProtocolConfig};
use crate::error::{ModemError, ModemResult};
use crate::port::Transport;
use crate::protocol::{ParseState, ProtocolEngine, ResultCode};
use crate::sink::{ByteObserver, NotificationSink};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport not started.
    Closed,
    /// Transport started, device not confirmed yet.
    Opening,
    /// Device answered; commands may be issued.
    Ready,
}

/// A half-duplex AT command session over one transport.
///
/// # Example
/// ```
/// use at_modem::clock::ManualClock;
/// use at_modem::config::ProtocolConfig;
/// use at_modem::port::MockSerialPort;
/// use at_modem::session::Session;
///
/// let port = MockSerialPort::new("MOCK0");
/// port.respond_always("AT", b"OK\r\n");
/// port.respond_to("AT+CGMM", b"SARA-U201\r\nOK\r\n");
///
/// let mut session = Session::new(port, ManualClock::new(), 115_200, ProtocolConfig::default());
/// session.open(false)?;
/// assert_eq!(session.command("AT+CGMM")?, "SARA-U201");
/// # Ok::<(), at_modem::ModemError>(())
/// ```
#[derive(Debug)]
pub struct Session<T: Transport, C: Clock = SystemClock> {
    transport: T,
    clock: C,
    engine: ProtocolEngine,
    config: ProtocolConfig,
    baud_rate: u32,
    state: SessionState,
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// Build a closed session. Nothing touches the transport until `open`.
    pub fn new(transport: T, clock: C, baud_rate: u32, config: ProtocolConfig) -> Self {
        Self {
            transport,
            clock,
            engine: ProtocolEngine::new(config.echo.clone()),
            config,
            baud_rate,
            state: SessionState::Closed,
        }
    }

    /// Build a closed session from the `serial` and `protocol` sections.
    pub fn from_config(transport: T, clock: C, config: &Config) -> Self {
        Self::new(
            transport,
            clock,
            config.serial.baud_rate,
            config.protocol.clone(),
        )
    }

    /// Route unsolicited lines to `sink`.
    pub fn with_notification_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.engine.set_notification_sink(Some(Box::new(sink)));
        self
    }

    /// Show every received byte to `observer`.
    pub fn with_byte_observer(mut self, observer: impl ByteObserver + 'static) -> Self {
        self.engine.set_byte_observer(Some(Box::new(observer)));
        self
    }

    /// Replace (or remove) the notification sink at runtime.
    pub fn set_notification_sink(
        &mut self,
        sink: Option<Box<dyn NotificationSink>>,
    ) -> Option<Box<dyn NotificationSink>> {
        self.engine.set_notification_sink(sink)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn parse_state(&self) -> ParseState {
        self.engine.state()
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Bytes received since the last line boundary.
    pub fn buffered(&self) -> &[u8] {
        self.engine.buffered()
    }

    /// Start the transport and confirm the device answers.
    ///
    /// With `perform_reset`, the device is restarted with the configured
    /// reset command and detected again. Any failure closes the transport
    /// and leaves the session `Closed`.
    pub fn open(&mut self, perform_reset: bool) -> ModemResult<()> {
        if self.state != SessionState::Closed {
            self.close();
        }

        self.transport
            .begin(self.baud_rate)
            .map_err(ModemError::TransportUnavailable)?;
        self.state = SessionState::Opening;
        debug!(port = self.transport.name(), baud = self.baud_rate, "transport started");

        if let Err(e) = self.bring_up(perform_reset) {
            warn!(port = self.transport.name(), error = %e, "modem did not come up");
            self.close();
            return Err(e);
        }

        self.state = SessionState::Ready;
        info!(port = self.transport.name(), baud = self.baud_rate, "modem ready");
        Ok(())
    }

    fn bring_up(&mut self, perform_reset: bool) -> ModemResult<()> {
        let timeout = self.config.autodetect_timeout();
        if !self.auto_detect(timeout) {
            return Err(ModemError::NotDetected(timeout));
        }

        if perform_reset {
            let command = self.config.reset_command.clone();
            self.exchange(&command, self.config.reset_timeout())?;
            if !self.auto_detect(timeout) {
                return Err(ModemError::NotDetected(timeout));
            }
        }
        Ok(())
    }

    /// Stop the transport. Any exchange in flight is abandoned.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.engine.abandon();
        self.transport.end();
        self.state = SessionState::Closed;
        info!(port = self.transport.name(), "session closed");
    }

    /// Write `command` and its line terminator, then arm the engine for the
    /// echo and final result.
    pub fn send(&mut self, command: &str) -> ModemResult<()> {
        if self.state == SessionState::Closed {
            return Err(ModemError::NotOpen);
        }
        debug!(command, "sending");
        self.transport.write_line(command)?;
        self.transport.flush()?;
        self.engine.begin_command(command);
        Ok(())
    }

    /// Write raw bytes without framing, e.g. message text after a `>` prompt.
    pub fn write_raw(&mut self, data: &[u8]) -> ModemResult<()> {
        if self.state == SessionState::Closed {
            return Err(ModemError::NotOpen);
        }
        self.transport.write_all(data)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Process whatever has arrived and report the current result.
    ///
    /// Never blocks. Calling it again with nothing new received changes
    /// nothing.
    pub fn poll(&mut self) -> ModemResult<ResultCode> {
        self.engine.drain(&mut self.transport)?;
        Ok(self.engine.result())
    }

    /// Keep the payload of the current command for [`take_payload`].
    ///
    /// [`take_payload`]: Session::take_payload
    pub fn set_capture(&mut self, capture: bool) {
        self.engine.set_capture(capture);
    }

    /// Payload captured for the last completed command.
    pub fn take_payload(&mut self) -> Option<String> {
        self.engine.take_payload()
    }

    /// Wait up to `timeout` for the final result of the last command.
    pub fn wait_for_result(&mut self, timeout: Duration) -> ModemResult<()> {
        self.wait(timeout)?.into_result()
    }

    /// Wait up to `timeout` and return the trimmed text between the echo and
    /// the final `OK`.
    pub fn wait_for_response(&mut self, timeout: Duration) -> ModemResult<String> {
        self.engine.set_capture(true);
        let outcome = self.wait(timeout);
        self.engine.set_capture(false);

        outcome?.into_result()?;
        Ok(self.engine.take_payload().unwrap_or_default())
    }

    /// Send `command` and return its payload, using the configured timeout.
    pub fn command(&mut self, command: &str) -> ModemResult<String> {
        self.command_with_timeout(command, self.config.command_timeout())
    }

    /// Send `command` and return its payload within `timeout`.
    pub fn command_with_timeout(&mut self, command: &str, timeout: Duration) -> ModemResult<String> {
        self.send(command)?;
        self.wait_for_response(timeout)
    }

    fn exchange(&mut self, command: &str, timeout: Duration) -> ModemResult<()> {
        self.send(command)?;
        self.wait_for_result(timeout)
    }

    fn wait(&mut self, timeout: Duration) -> ModemResult<ResultCode> {
        let start = self.clock.now();
        loop {
            let code = self.poll()?;
            if code.is_complete() {
                return Ok(code);
            }
            if self.clock.elapsed_since(start) >= timeout {
                self.engine.abandon();
                debug!(?timeout, "timed out waiting for final result");
                return Err(ModemError::Timeout(timeout));
            }
            self.config.pacing.pause(&self.clock);
        }
    }

    /// Send the probe command and report whether the device said `OK`.
    pub fn probe(&mut self) -> bool {
        let command = self.config.probe_command.clone();
        match self.exchange(&command, self.config.probe_timeout()) {
            Ok(()) => true,
            Err(ModemError::Transport(e)) => {
                warn!(error = %e, "transport error while probing");
                false
            }
            Err(_) => false,
        }
    }

    /// Restart the device with the configured reset command.
    pub fn reset_link(&mut self) -> bool {
        let command = self.config.reset_command.clone();
        match self.exchange(&command, self.config.reset_timeout()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "reset failed");
                false
            }
        }
    }

    /// Probe repeatedly until the device answers or `timeout` elapses.
    pub fn auto_detect(&mut self, timeout: Duration) -> bool {
        let start = self.clock.now();
        let mut attempts = 0u32;
        while self.clock.elapsed_since(start) < timeout {
            attempts += 1;
            if self.probe() {
                debug!(attempts, "device detected");
                return true;
            }
            self.clock.sleep(self.config.autodetect_interval());
        }
        debug!(attempts, ?timeout, "device not detected");
        false
    }

    /// Close the session and hand back the transport.
    pub fn into_transport(mut self) -> T {
        self.close();
        self.transport
    }
}
