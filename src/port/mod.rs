//! Transport abstraction layer.
//!
//! Provides the `Transport` trait the protocol engine reads from, a real
//! serial port implementation and a scriptable mock for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
