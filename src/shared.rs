//! Thread-safe handle to a session.
//!
//! A modem link is half duplex: one exchange at a time. `SharedSession`
//! serializes callers on a mutex, so a background task draining
//! notifications and a foreground task issuing commands can share a port.
//!
//! ```text
//! worker A ─┐
//! worker B ─┼──> SharedSession ──> Arc<Mutex<Session>> ──> Transport
//! tokio    ─┘     (spawn_blocking)
//! ```

use crate::clock::{Clock, SystemClock};
use crate::error::ModemResult;
use crate::port::Transport;
use crate::protocol::ResultCode;
use crate::session::Session;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable, lock-protected session handle.
#[derive(Debug)]
pub struct SharedSession<T: Transport, C: Clock = SystemClock> {
    inner: Arc<Mutex<Session<T, C>>>,
}

impl<T: Transport, C: Clock> Clone for SharedSession<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport, C: Clock> SharedSession<T, C> {
    pub fn new(session: Session<T, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Lock the session for a multi-step exchange (e.g. a `>` prompt
    /// followed by raw text). Other handles block until the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, Session<T, C>> {
        self.inner.lock()
    }

    pub fn open(&self, perform_reset: bool) -> ModemResult<()> {
        self.inner.lock().open(perform_reset)
    }

    pub fn close(&self) {
        self.inner.lock().close();
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().is_ready()
    }

    /// Run one command to completion while holding the lock.
    pub fn command(&self, command: &str) -> ModemResult<String> {
        self.inner.lock().command(command)
    }

    pub fn command_with_timeout(&self, command: &str, timeout: Duration) -> ModemResult<String> {
        self.inner.lock().command_with_timeout(command, timeout)
    }

    /// Process pending input so notifications are delivered between commands.
    pub fn poll(&self) -> ModemResult<ResultCode> {
        self.inner.lock().poll()
    }

    pub fn probe(&self) -> bool {
        self.inner.lock().probe()
    }
}

#[cfg(feature = "async")]
impl<T, C> SharedSession<T, C>
where
    T: Transport + 'static,
    C: Clock + 'static,
{
    /// Run `command` on the blocking pool so the wait loop never stalls the
    /// async runtime.
    pub async fn command_async(&self, command: impl Into<String>) -> ModemResult<String> {
        let command = command.into();
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || inner.lock().command(&command))
            .await
            .map_err(join_error)?
    }

    /// Async counterpart of [`poll`](SharedSession::poll).
    pub async fn poll_async(&self) -> ModemResult<ResultCode> {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || inner.lock().poll())
            .await
            .map_err(join_error)?
    }
}

#[cfg(feature = "async")]
fn join_error(e: tokio::task::JoinError) -> crate::error::ModemError {
    crate::port::PortError::Io(std::io::Error::other(e)).into()
}
