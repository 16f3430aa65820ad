//! The byte-at-a-time AT response parser.

use super::accumulator::LineAccumulator;
use super::{EchoMatch, ParseState, ResultCode, FINAL_RESULTS};
use crate::port::{PortError, Transport};
use crate::sink::{ByteObserver, NotificationSink};
use tracing::{debug, trace};

/// Classifies the incoming byte stream into echoes, final results and
/// unsolicited lines.
///
/// The engine never reads on its own and never blocks: [`drain`] consumes
/// whatever the transport already has buffered and returns.
///
/// [`drain`]: ProtocolEngine::drain
pub struct ProtocolEngine {
    buffer: LineAccumulator,
    state: ParseState,
    result: ResultCode,
    echo_match: EchoMatch,
    /// Command text of the exchange in flight, for `EchoMatch::Exact`.
    expected_echo: Option<String>,
    capture: bool,
    payload: Option<String>,
    sink: Option<Box<dyn NotificationSink>>,
    observer: Option<Box<dyn ByteObserver>>,
}

impl ProtocolEngine {
    /// A fresh engine. Nothing is outstanding, so the result reads `Ok`.
    pub fn new(echo_match: EchoMatch) -> Self {
        Self {
            buffer: LineAccumulator::new(),
            state: ParseState::Idle,
            result: ResultCode::Ok,
            echo_match,
            expected_echo: None,
            capture: false,
            payload: None,
            sink: None,
            observer: None,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn result(&self) -> ResultCode {
        self.result
    }

    /// Bytes received since the last boundary.
    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn echo_match(&self) -> &EchoMatch {
        &self.echo_match
    }

    /// Replace the notification sink, returning the previous one.
    pub fn set_notification_sink(
        &mut self,
        sink: Option<Box<dyn NotificationSink>>,
    ) -> Option<Box<dyn NotificationSink>> {
        std::mem::replace(&mut self.sink, sink)
    }

    /// Replace the byte observer, returning the previous one.
    pub fn set_byte_observer(
        &mut self,
        observer: Option<Box<dyn ByteObserver>>,
    ) -> Option<Box<dyn ByteObserver>> {
        std::mem::replace(&mut self.observer, observer)
    }

    /// Ask for the payload of the current (or next) command to be kept.
    pub fn set_capture(&mut self, capture: bool) {
        self.capture = capture;
    }

    pub fn capture_requested(&self) -> bool {
        self.capture
    }

    /// Take the captured payload of the last completed command, if any.
    pub fn take_payload(&mut self) -> Option<String> {
        self.payload.take()
    }

    /// Prepare for the exchange started by sending `command`.
    ///
    /// Forces `Idle` and `Pending` and drops any buffered bytes, regardless
    /// of what was in flight.
    pub fn begin_command(&mut self, command: &str) {
        self.buffer.clear();
        self.state = ParseState::Idle;
        self.result = ResultCode::Pending;
        self.expected_echo = Some(command.trim().to_string());
        self.payload = None;
    }

    /// Give up on the exchange in flight after a timeout.
    ///
    /// Partial data is discarded. The expected echo is kept so that a late
    /// echo is still swallowed instead of surfacing as a notification.
    pub fn abandon(&mut self) {
        self.buffer.clear();
        self.state = ParseState::Idle;
        self.capture = false;
    }

    /// Feed every byte the transport currently has, stopping early when a
    /// command completes so the caller sees the result promptly.
    ///
    /// Returns the final result if one was recognized during this call.
    pub fn drain<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<Option<ResultCode>, PortError> {
        while transport.bytes_available()? > 0 {
            let Some(byte) = transport.read_byte()? else {
                break;
            };
            if let Some(code) = self.feed(byte) {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }

    /// Process one received byte.
    ///
    /// Returns the final result when this byte completed a response.
    pub fn feed(&mut self, byte: u8) -> Option<ResultCode> {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_byte_received(byte);
        }
        self.buffer.push(byte);

        match self.state {
            ParseState::Idle => {
                self.feed_idle();
                None
            }
            ParseState::AwaitingResult if byte == b'\n' => self.check_final_result(),
            ParseState::AwaitingResult => None,
        }
    }

    fn feed_idle(&mut self) {
        if !self.buffer.is_line_complete() {
            return;
        }

        if self.is_echo() {
            debug!(echo = %self.buffer.trimmed(), "echo received");
            self.state = ParseState::AwaitingResult;
            self.buffer.clear();
            return;
        }

        let line = self.buffer.trimmed();
        self.buffer.clear();
        if line.is_empty() {
            return;
        }

        trace!(line = %line, "unsolicited line");
        if let Some(sink) = self.sink.as_mut() {
            sink.on_notification(&line);
        }
    }

    fn is_echo(&self) -> bool {
        match &self.echo_match {
            EchoMatch::Exact => self
                .expected_echo
                .as_deref()
                .is_some_and(|command| self.buffer.trimmed() == command),
            EchoMatch::Prefix(prefix) => self.buffer.starts_with(prefix.as_bytes()),
        }
    }

    fn check_final_result(&mut self) -> Option<ResultCode> {
        let (code, position) = FINAL_RESULTS.into_iter().find_map(|code| {
            let marker = code.marker()?;
            self.buffer
                .final_line_position(marker.as_bytes())
                .map(|position| (code, position))
        })?;

        if self.capture {
            self.payload = Some(self.buffer.trimmed_prefix(position));
            self.capture = false;
        }

        debug!(result = %code, "final result received");
        self.result = code;
        self.state = ParseState::Idle;
        self.expected_echo = None;
        self.buffer.clear();
        Some(code)
    }
}

impl Default for ProtocolEngine {
    fn default() -> Self {
        Self::new(EchoMatch::default())
    }
}

impl std::fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("state", &self.state)
            .field("result", &self.result)
            .field("echo_match", &self.echo_match)
            .field("expected_echo", &self.expected_echo)
            .field("buffered", &self.buffer.len())
            .field("capture", &self.capture)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;
    use crate::sink::{FnSink, MockNotificationSink};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording_engine(echo_match: EchoMatch) -> (ProtocolEngine, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let mut engine = ProtocolEngine::new(echo_match);
        engine.set_notification_sink(Some(Box::new(FnSink(move |line: &str| {
            recorder.lock().push(line.to_string())
        }))));
        (engine, seen)
    }

    fn feed_all(engine: &mut ProtocolEngine, bytes: &[u8]) -> Option<ResultCode> {
        let mut last = None;
        for &b in bytes {
            if let Some(code) = engine.feed(b) {
                last = Some(code);
            }
        }
        last
    }

    #[test]
    fn test_ok_after_echo() {
        let mut engine = ProtocolEngine::default();
        engine.begin_command("AT");
        assert_eq!(engine.result(), ResultCode::Pending);

        assert_eq!(feed_all(&mut engine, b"AT\r\n"), None);
        assert_eq!(engine.state(), ParseState::AwaitingResult);
        assert!(engine.buffered().is_empty());

        assert_eq!(feed_all(&mut engine, b"OK\r\n"), Some(ResultCode::Ok));
        assert_eq!(engine.state(), ParseState::Idle);
        assert_eq!(engine.result(), ResultCode::Ok);
        assert!(engine.buffered().is_empty());
    }

    #[test]
    fn test_error_and_no_carrier() {
        let mut engine = ProtocolEngine::default();
        engine.begin_command("AT");
        assert_eq!(
            feed_all(&mut engine, b"AT\r\nERROR\r\n"),
            Some(ResultCode::Error)
        );

        engine.begin_command("ATD+15551234;");
        assert_eq!(
            feed_all(&mut engine, b"ATD+15551234;\r\nNO CARRIER\r\n"),
            Some(ResultCode::NoCarrier)
        );
    }

    #[test]
    fn test_payload_capture() {
        let mut engine = ProtocolEngine::default();
        engine.set_capture(true);
        engine.begin_command("AT+X");

        feed_all(&mut engine, b"AT+X\r\nsome data\r\nOK\r\n");

        assert_eq!(engine.take_payload().as_deref(), Some("some data"));
        assert_eq!(engine.take_payload(), None);
        assert!(!engine.capture_requested());
    }

    #[test]
    fn test_multiline_payload_is_trimmed_as_a_whole() {
        let mut engine = ProtocolEngine::default();
        engine.set_capture(true);
        engine.begin_command("AT+CGMI");

        feed_all(&mut engine, b"AT+CGMI\r\n\r\nu-blox\r\nSARA\r\n\r\nOK\r\n");

        assert_eq!(engine.take_payload().as_deref(), Some("u-blox\r\nSARA"));
    }

    #[test]
    fn test_no_payload_without_capture() {
        let mut engine = ProtocolEngine::default();
        engine.begin_command("AT+X");
        feed_all(&mut engine, b"AT+X\r\nsome data\r\nOK\r\n");
        assert_eq!(engine.take_payload(), None);
    }

    #[test]
    fn test_notification_before_echo() {
        let (mut engine, seen) = recording_engine(EchoMatch::Exact);
        engine.begin_command("AT");

        let result = feed_all(&mut engine, b"ring\r\nAT\r\nOK\r\n");

        assert_eq!(result, Some(ResultCode::Ok));
        assert_eq!(*seen.lock(), vec!["ring".to_string()]);
    }

    #[test]
    fn test_idle_lines_are_trimmed_and_empty_ones_dropped() {
        let (mut engine, seen) = recording_engine(EchoMatch::Exact);

        feed_all(&mut engine, b"\r\n  +CREG: 1 \r\n\r\n\t\r\n");

        assert_eq!(*seen.lock(), vec!["+CREG: 1".to_string()]);
        assert!(engine.buffered().is_empty());
    }

    #[test]
    fn test_partial_line_accumulates() {
        let (mut engine, seen) = recording_engine(EchoMatch::Exact);
        feed_all(&mut engine, b"+CMTI: \"SM\",");
        assert!(seen.lock().is_empty());
        assert_eq!(engine.buffered(), b"+CMTI: \"SM\",");

        feed_all(&mut engine, b"3\r\n");
        assert_eq!(*seen.lock(), vec!["+CMTI: \"SM\",3".to_string()]);
    }

    #[test]
    fn test_exact_echo_does_not_swallow_similar_notifications() {
        let (mut engine, seen) = recording_engine(EchoMatch::Exact);
        engine.begin_command("AT+CSQ");

        feed_all(&mut engine, b"AT+CSQ=?\r\nAT+CSQ\r\nOK\r\n");

        assert_eq!(*seen.lock(), vec!["AT+CSQ=?".to_string()]);
        assert_eq!(engine.result(), ResultCode::Ok);
    }

    #[test]
    fn test_prefix_echo_matches_any_at_line() {
        let (mut engine, seen) = recording_engine(EchoMatch::Prefix("AT".to_string()));
        engine.begin_command("AT+CSQ");

        feed_all(&mut engine, b"ATE1\r\nOK\r\n");

        assert!(seen.lock().is_empty());
        assert_eq!(engine.result(), ResultCode::Ok);
    }

    #[test]
    fn test_echo_without_outstanding_command_is_a_notification() {
        let (mut engine, seen) = recording_engine(EchoMatch::Exact);
        feed_all(&mut engine, b"AT\r\n");
        assert_eq!(*seen.lock(), vec!["AT".to_string()]);
        assert_eq!(engine.state(), ParseState::Idle);
    }

    #[test]
    fn test_marker_inside_payload_line_is_not_final() {
        let mut engine = ProtocolEngine::default();
        engine.set_capture(true);
        engine.begin_command("AT+CMGR=1");

        assert_eq!(feed_all(&mut engine, b"AT+CMGR=1\r\nREAD THE BOOK\r\n"), None);
        assert_eq!(engine.result(), ResultCode::Pending);

        assert_eq!(feed_all(&mut engine, b"OK\r\n"), Some(ResultCode::Ok));
        assert_eq!(engine.take_payload().as_deref(), Some("READ THE BOOK"));
    }

    #[test]
    fn test_idle_result_lines_are_notifications() {
        let mut sink = MockNotificationSink::new();
        let mut seq = mockall::Sequence::new();
        for expected in ["NO CARRIER", "OK", "ERROR"] {
            sink.expect_on_notification()
                .withf(move |line| line == expected)
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }

        let mut engine = ProtocolEngine::default();
        engine.set_notification_sink(Some(Box::new(sink)));

        assert_eq!(feed_all(&mut engine, b"NO CARRIER\r\nOK\r\nERROR\r\n"), None);
        assert_eq!(engine.result(), ResultCode::Ok);
        assert_eq!(engine.state(), ParseState::Idle);
    }

    #[test]
    fn test_begin_command_resets_in_flight_state() {
        let mut engine = ProtocolEngine::default();
        engine.begin_command("AT");
        feed_all(&mut engine, b"AT\r\n");
        assert_eq!(engine.state(), ParseState::AwaitingResult);

        feed_all(&mut engine, b"+CREG: 2\r\n");
        assert!(!engine.buffered().is_empty());

        engine.begin_command("ATI");
        assert_eq!(engine.state(), ParseState::Idle);
        assert_eq!(engine.result(), ResultCode::Pending);
        assert!(engine.buffered().is_empty());
    }

    #[test]
    fn test_abandon_clears_buffer_and_swallows_late_echo() {
        let (mut engine, seen) = recording_engine(EchoMatch::Exact);
        engine.set_capture(true);
        engine.begin_command("AT+COPS?");
        feed_all(&mut engine, b"AT+CO");

        engine.abandon();
        assert!(engine.buffered().is_empty());
        assert!(!engine.capture_requested());

        feed_all(&mut engine, b"\r\nAT+COPS?\r\nOK\r\n");
        assert!(seen.lock().is_empty());
        assert_eq!(engine.result(), ResultCode::Ok);
    }

    #[test]
    fn test_drain_stops_at_completion() {
        let mut port = MockSerialPort::new("MOCK0");
        port.begin(115_200).unwrap();
        port.enqueue_read(b"AT\r\nOK\r\nRING\r\n");

        let (mut engine, seen) = recording_engine(EchoMatch::Exact);
        engine.begin_command("AT");

        assert_eq!(engine.drain(&mut port).unwrap(), Some(ResultCode::Ok));
        assert_eq!(port.available_bytes(), 6);
        assert!(seen.lock().is_empty());

        assert_eq!(engine.drain(&mut port).unwrap(), None);
        assert_eq!(port.available_bytes(), 0);
        assert_eq!(*seen.lock(), vec!["RING".to_string()]);
    }

    #[test]
    fn test_drain_propagates_transport_errors() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut engine = ProtocolEngine::default();
        assert!(matches!(engine.drain(&mut port), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_observer_sees_every_byte() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let mut engine = ProtocolEngine::default();
        engine.set_byte_observer(Some(Box::new(crate::sink::FnObserver(move |b: u8| {
            recorder.lock().push(b)
        }))));

        feed_all(&mut engine, b"RING\r\n");
        assert_eq!(*seen.lock(), b"RING\r\n".to_vec());
    }
}
