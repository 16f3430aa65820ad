//! Mock transport for testing.
//!
//! Provides a `MockSerialPort` that behaves like a modem on the other end of
//! a serial line without requiring hardware: it echoes command lines, plays
//! back scripted replies and records everything the session wrote.

use super::error::PortError;
use super::traits::Transport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A scripted reply for one command line.
#[derive(Debug)]
struct ReplyRule {
    command: String,
    reply: Vec<u8>,
    /// `None` repeats forever.
    remaining: Option<usize>,
}

/// Inner state of the mock port, shared between clones.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes waiting to be read by the session.
    read_queue: VecDeque<u8>,
    /// Command lines written by the session, without terminators.
    write_log: Vec<String>,
    /// Raw bytes written but not yet terminated by `\r\n`.
    pending_line: Vec<u8>,
    /// Scripted replies, matched in insertion order.
    rules: Vec<ReplyRule>,
    /// Whether written lines are echoed back.
    echo: bool,
    /// Baud rate given to the last successful `begin`.
    baud_rate: Option<u32>,
    /// Make the next `begin` fail.
    fail_begin: bool,
    /// Number of `flush` calls.
    flushes: usize,
}

/// Mock modem transport.
///
/// Clones share state, so a test can keep one handle for scripting and
/// inspection while the session owns another.
///
/// # Example
/// ```
/// use at_modem::port::{MockSerialPort, Transport};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.respond_to("AT+CSQ", b"+CSQ: 20,0\r\nOK\r\n");
///
/// port.begin(115_200).unwrap();
/// port.write_line("AT+CSQ").unwrap();
///
/// let mut received = Vec::new();
/// while let Some(byte) = port.read_byte().unwrap() {
///     received.push(byte);
/// }
/// assert_eq!(received, b"AT+CSQ\r\n+CSQ: 20,0\r\nOK\r\n");
/// assert_eq!(port.get_write_log(), vec!["AT+CSQ".to_string()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock port that echoes commands, as modems do by default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                echo: true,
                ..Default::default()
            })),
        }
    }

    /// Enqueue bytes to be returned by subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Reply once with `reply` the next time `command` is written.
    pub fn respond_to(&self, command: &str, reply: &[u8]) {
        self.add_rule(command, reply, Some(1));
    }

    /// Reply with `reply` every time `command` is written.
    pub fn respond_always(&self, command: &str, reply: &[u8]) {
        self.add_rule(command, reply, None);
    }

    fn add_rule(&self, command: &str, reply: &[u8], remaining: Option<usize>) {
        self.state.lock().rules.push(ReplyRule {
            command: command.to_string(),
            reply: reply.to_vec(),
            remaining,
        });
    }

    /// Turn the automatic command echo on or off (`ATE1` / `ATE0`).
    pub fn set_echo(&self, echo: bool) {
        self.state.lock().echo = echo;
    }

    /// Make the next `begin` fail as if the device node did not exist.
    pub fn set_fail_on_begin(&self, fail: bool) {
        self.state.lock().fail_begin = fail;
    }

    /// Get a copy of every command line written so far.
    pub fn get_write_log(&self) -> Vec<String> {
        self.state.lock().write_log.clone()
    }

    /// Clear the write log.
    pub fn clear_write_log(&self) {
        self.state.lock().write_log.clear();
    }

    /// Number of bytes waiting to be read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Whether the port is currently open.
    pub fn is_open(&self) -> bool {
        self.state.lock().baud_rate.is_some()
    }

    /// Baud rate of the current open, if any.
    pub fn baud_rate(&self) -> Option<u32> {
        self.state.lock().baud_rate
    }

    /// Number of times the port has been flushed.
    pub fn flush_count(&self) -> usize {
        self.state.lock().flushes
    }
}

impl MockPortState {
    fn ensure_open(&self) -> Result<(), PortError> {
        if self.baud_rate.is_some() {
            Ok(())
        } else {
            Err(PortError::NotOpen)
        }
    }

    /// Handle one complete line written by the session.
    fn line_written(&mut self, line: String) {
        if self.echo {
            self.read_queue.extend(line.as_bytes());
            self.read_queue.extend(b"\r\n");
        }

        let rule = self
            .rules
            .iter_mut()
            .find(|rule| rule.command == line && rule.remaining != Some(0));
        if let Some(rule) = rule {
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            self.read_queue.extend(&rule.reply);
        }
        self.rules.retain(|rule| rule.remaining != Some(0));

        self.write_log.push(line);
    }
}

impl Transport for MockSerialPort {
    fn begin(&mut self, baud_rate: u32) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.fail_begin {
            state.fail_begin = false;
            return Err(PortError::not_found(&self.name));
        }
        state.baud_rate = Some(baud_rate);
        Ok(())
    }

    fn end(&mut self) {
        let mut state = self.state.lock();
        state.baud_rate = None;
        state.pending_line.clear();
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        for &byte in data {
            state.pending_line.push(byte);
            if state.pending_line.ends_with(b"\r\n") {
                let len = state.pending_line.len() - 2;
                let line = String::from_utf8_lossy(&state.pending_line[..len]).into_owned();
                state.pending_line.clear();
                state.line_written(line);
            }
        }

        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.flushes += 1;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.read_queue.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, PortError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        Ok(state.read_queue.pop_front())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_port() -> MockSerialPort {
        let mut port = MockSerialPort::new("MOCK0");
        port.begin(115_200).unwrap();
        port
    }

    fn read_all(port: &mut MockSerialPort) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(byte) = port.read_byte().unwrap() {
            out.push(byte);
        }
        out
    }

    #[test]
    fn test_enqueue_and_read() {
        let mut port = open_port();
        port.enqueue_read(b"RING\r\n");

        assert_eq!(port.bytes_available().unwrap(), 6);
        assert_eq!(read_all(&mut port), b"RING\r\n");
        assert_eq!(port.read_byte().unwrap(), None);
    }

    #[test]
    fn test_write_logging_and_echo() {
        let mut port = open_port();
        port.write_line("AT").unwrap();
        port.write_line("ATI").unwrap();

        assert_eq!(port.get_write_log(), vec!["AT", "ATI"]);
        assert_eq!(read_all(&mut port), b"AT\r\nATI\r\n");
    }

    #[test]
    fn test_echo_disabled() {
        let mut port = open_port();
        port.set_echo(false);
        port.respond_to("AT", b"OK\r\n");
        port.write_line("AT").unwrap();

        assert_eq!(read_all(&mut port), b"OK\r\n");
    }

    #[test]
    fn test_one_shot_reply_is_consumed() {
        let mut port = open_port();
        port.respond_to("AT", b"OK\r\n");

        port.write_line("AT").unwrap();
        port.write_line("AT").unwrap();

        assert_eq!(read_all(&mut port), b"AT\r\nOK\r\nAT\r\n");
    }

    #[test]
    fn test_repeating_reply() {
        let mut port = open_port();
        port.respond_always("AT", b"OK\r\n");

        port.write_line("AT").unwrap();
        port.write_line("AT").unwrap();

        assert_eq!(read_all(&mut port), b"AT\r\nOK\r\nAT\r\nOK\r\n");
    }

    #[test]
    fn test_split_writes_form_one_line() {
        let mut port = open_port();
        port.write_bytes(b"AT+C").unwrap();
        port.write_bytes(b"SQ\r").unwrap();
        assert!(port.get_write_log().is_empty());

        port.write_bytes(b"\n").unwrap();
        assert_eq!(port.get_write_log(), vec!["AT+CSQ"]);
    }

    #[test]
    fn test_closed_port_rejects_io() {
        let mut port = MockSerialPort::new("MOCK0");
        assert!(matches!(port.write_line("AT"), Err(PortError::NotOpen)));
        assert!(matches!(port.read_byte(), Err(PortError::NotOpen)));
        assert!(matches!(port.flush(), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_fail_on_begin_is_one_shot() {
        let mut port = MockSerialPort::new("MOCK0");
        port.set_fail_on_begin(true);

        assert!(matches!(port.begin(9600), Err(PortError::NotFound(_))));
        assert!(!port.is_open());

        port.begin(9600).unwrap();
        assert_eq!(port.baud_rate(), Some(9600));

        port.end();
        assert!(!port.is_open());
    }

    #[test]
    fn test_clones_share_state() {
        let mut port = open_port();
        let handle = port.clone();

        port.write_line("AT+CFUN=16").unwrap();
        port.flush().unwrap();

        assert_eq!(handle.get_write_log(), vec!["AT+CFUN=16"]);
        assert_eq!(handle.flush_count(), 1);
    }
}
