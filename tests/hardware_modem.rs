//! Tests requiring a real modem.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyUSB0   # or COM3 on Windows
//! export TEST_BAUD=115200         # optional, default: 115200
//!
//! cargo test --features hardware-tests --test hardware_modem -- --ignored
//! ```

#![cfg(feature = "hardware-tests")]

use at_modem::config::ProtocolConfig;
use at_modem::port::{PortConfiguration, SyncSerialPort};
use at_modem::{Session, SystemClock};
use std::env;
use std::time::Duration;

/// Get the test port from environment variable.
fn get_test_port() -> Option<String> {
    env::var("TEST_PORT").ok()
}

/// Get the test baud rate from environment variable (default: 115200).
fn get_test_baud() -> u32 {
    env::var("TEST_BAUD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(115_200)
}

fn hardware_session() -> Option<Session<SyncSerialPort, SystemClock>> {
    let Some(port_name) = get_test_port() else {
        eprintln!("TEST_PORT not set, skipping");
        return None;
    };
    let port = SyncSerialPort::new(port_name, PortConfiguration::default());
    Some(Session::new(
        port,
        SystemClock,
        get_test_baud(),
        ProtocolConfig::default(),
    ))
}

#[test]
#[ignore]
fn test_real_modem_answers_probe() {
    let Some(mut session) = hardware_session() else {
        return;
    };

    session.open(false).expect("modem should answer AT");
    assert!(session.probe());
    session.close();
}

#[test]
#[ignore]
fn test_real_modem_identification() {
    let Some(mut session) = hardware_session() else {
        return;
    };
    session.open(false).expect("modem should answer AT");

    let model = session
        .command_with_timeout("AT+CGMM", Duration::from_secs(2))
        .expect("AT+CGMM should succeed");
    println!("model: {}", model);
    assert!(!model.is_empty());

    assert!(session.command("AT+NOSUCHCOMMAND").is_err());
}
