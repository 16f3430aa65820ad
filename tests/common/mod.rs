//! Shared test utilities for the at-modem integration tests.
//!
//! - Scripted mock modems
//! - A recording notification sink
//! - Sessions on a manual clock, so timeouts cost no wall time

#![allow(dead_code)]

use at_modem::clock::ManualClock;
use at_modem::config::ProtocolConfig;
use at_modem::port::MockSerialPort;
use at_modem::session::Session;
use at_modem::sink::NotificationSink;
use parking_lot::Mutex;
use std::sync::Arc;

pub type TestSession = Session<MockSerialPort, ManualClock>;

/// Create a mock modem that answers the probe command with `OK` every time.
pub fn create_responsive_modem(port_name: &str) -> MockSerialPort {
    let port = MockSerialPort::new(port_name);
    port.respond_always("AT", b"OK\r\n");
    port
}

/// Create a mock modem with one-shot replies for the given commands.
///
/// # Example
/// ```ignore
/// let port = create_scripted_modem("MOCK0", &[("AT+CSQ", "+CSQ: 9,99\r\nOK\r\n")]);
/// ```
pub fn create_scripted_modem(port_name: &str, script: &[(&str, &str)]) -> MockSerialPort {
    let port = create_responsive_modem(port_name);
    for (command, reply) in script {
        port.respond_to(command, reply.as_bytes());
    }
    port
}

/// Build a closed session on `port` with default protocol settings.
pub fn session_on(port: &MockSerialPort) -> (TestSession, ManualClock) {
    session_with(port, ProtocolConfig::default())
}

/// Build a closed session on `port` with custom protocol settings.
pub fn session_with(port: &MockSerialPort, config: ProtocolConfig) -> (TestSession, ManualClock) {
    let clock = ManualClock::new();
    let session = Session::new(port.clone(), clock.clone(), 115_200, config);
    (session, clock)
}

/// Build an open session; the modem must answer the probe.
pub fn open_session(port: &MockSerialPort) -> (TestSession, ManualClock) {
    let (mut session, clock) = session_on(port);
    session.open(false).expect("mock modem should answer the probe");
    (session, clock)
}

/// A sink that records every notification it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn on_notification(&mut self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
