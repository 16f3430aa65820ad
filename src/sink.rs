//! Consumers the protocol engine hands data to.
//!
//! A [`NotificationSink`] receives unsolicited result codes (URCs) such as
//! `RING` or `+CMTI: "SM",3`. A [`ByteObserver`] sees every received byte
//! before it is parsed, for wire-level tracing.

use parking_lot::Mutex;
use std::sync::{mpsc, Weak};
use tracing::{debug, trace};

/// Receives complete, trimmed, non-empty lines that arrive while no command
/// is outstanding.
///
/// Implementations must not block; the engine calls them from inside a poll.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send {
    /// Handle one unsolicited line.
    fn on_notification(&mut self, line: &str);
}

/// Adapter turning a closure into a [`NotificationSink`].
///
/// ```
/// use at_modem::sink::{FnSink, NotificationSink};
///
/// let mut seen = Vec::new();
/// {
///     let mut sink = FnSink(|line: &str| seen.push(line.to_string()));
///     sink.on_notification("RING");
/// }
/// assert_eq!(seen, vec!["RING"]);
/// ```
pub struct FnSink<F>(pub F);

impl<F> NotificationSink for FnSink<F>
where
    F: FnMut(&str) + Send,
{
    fn on_notification(&mut self, line: &str) {
        (self.0)(line)
    }
}

/// Forwards lines to a channel; a disconnected receiver is ignored.
impl NotificationSink for mpsc::Sender<String> {
    fn on_notification(&mut self, line: &str) {
        if self.send(line.to_string()).is_err() {
            debug!("notification receiver dropped, discarding {:?}", line);
        }
    }
}

/// Forwards to a sink owned elsewhere, for as long as it is alive.
impl<S: NotificationSink> NotificationSink for Weak<Mutex<S>> {
    fn on_notification(&mut self, line: &str) {
        match self.upgrade() {
            Some(sink) => sink.lock().on_notification(line),
            None => debug!("notification sink dropped, discarding {:?}", line),
        }
    }
}

/// Sees every byte as it is received, before parsing.
pub trait ByteObserver: Send {
    /// Called once per received byte.
    fn on_byte_received(&mut self, byte: u8);
}

/// Adapter turning a closure into a [`ByteObserver`].
pub struct FnObserver<F>(pub F);

impl<F> ByteObserver for FnObserver<F>
where
    F: FnMut(u8) + Send,
{
    fn on_byte_received(&mut self, byte: u8) {
        (self.0)(byte)
    }
}

/// Logs received traffic line by line at `trace` level on the
/// `at_modem::wire` target.
#[derive(Debug, Default)]
pub struct TraceObserver {
    line: Vec<u8>,
}

impl TraceObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteObserver for TraceObserver {
    fn on_byte_received(&mut self, byte: u8) {
        if byte == b'\n' {
            trace!(target: "at_modem::wire", line = %String::from_utf8_lossy(&self.line).trim_end(), "rx");
            self.line.clear();
        } else {
            self.line.push(byte);
        }
    }
}
