use at_modem::config::{Config, ConfigLoader};
use at_modem::logging::init_tracing;
use at_modem::{
    Clock, FnSink, ModemError, Session, SyncSerialPort, SystemClock, TraceObserver,
};
use chrono::Local;
use clap::Parser;
use serde_json::json;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "at-modem",
    version,
    about = "Send AT commands to a serial modem and print the responses.",
    long_about = "Opens the modem, waits until it answers, then runs each COMMAND in turn \
                  (or one per line from stdin when none are given). Unsolicited notifications \
                  are printed with a timestamp as they arrive."
)]
struct Args {
    /// Serial port path or alias (overrides `serial.port`).
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides `serial.baud_rate`).
    #[arg(short, long)]
    baud: Option<u32>,

    /// Configuration file to load instead of the standard locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Restart the modem with the reset command before running commands.
    #[arg(long)]
    reset: bool,

    /// Per-command timeout in milliseconds (overrides `protocol.command_timeout_ms`).
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Keep listening for notifications this long after the last command.
    #[arg(long, default_value_t = 0)]
    listen_ms: u64,

    /// Print one JSON object per line instead of plain text.
    #[arg(long)]
    json: bool,

    /// Log every received line at trace level.
    #[arg(long)]
    trace_wire: bool,

    /// Write the effective configuration to PATH and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,

    /// Commands to send, e.g. `AT+CSQ`.
    commands: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("at-modem: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns `Ok(false)` when at least one command did not end in `OK`.
fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let mut loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    apply_args(loader.config_mut(), &args);
    loader.config().validate()?;

    if let Some(path) = &args.write_config {
        loader.save_to(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(true);
    }

    let config = loader.into_config();
    init_tracing(&config.logging).map_err(|e| e as Box<dyn std::error::Error>)?;

    let port_name = config
        .serial
        .port
        .as_deref()
        .map(|name| config.serial.resolve_port(name))
        .ok_or("no serial port given (use --port or set serial.port)")?;

    let json_output = args.json;
    let transport = SyncSerialPort::new(&port_name, config.serial.port_configuration());
    let mut session = Session::from_config(transport, SystemClock, &config)
        .with_notification_sink(FnSink(move |line: &str| print_notification(line, json_output)));
    if args.trace_wire {
        session = session.with_byte_observer(TraceObserver::new());
    }

    info!(port = %port_name, baud = config.serial.baud_rate, "opening modem");
    session.open(args.reset)?;

    let commands: Box<dyn Iterator<Item = io::Result<String>>> = if args.commands.is_empty() {
        Box::new(io::stdin().lock().lines())
    } else {
        Box::new(args.commands.clone().into_iter().map(Ok))
    };

    let mut all_ok = true;
    for line in commands {
        let line = line?;
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let outcome = session.command(command);
        all_ok &= outcome.is_ok();
        print_outcome(command, &outcome, args.json);
        if let Err(ModemError::Transport(e)) = &outcome {
            error!(error = %e, "transport failed, giving up");
            break;
        }
    }

    if args.listen_ms > 0 {
        listen(&mut session, Duration::from_millis(args.listen_ms))?;
    }

    session.close();
    Ok(all_ok)
}

/// Fold command-line overrides into the loaded configuration.
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(port) = &args.port {
        config.serial.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(ms) = args.timeout_ms {
        config.protocol.command_timeout_ms = ms;
    }
}

fn listen(
    session: &mut Session<SyncSerialPort, SystemClock>,
    duration: Duration,
) -> Result<(), ModemError> {
    let start = session.clock().now();
    while session.clock().elapsed_since(start) < duration {
        session.poll()?;
        session.config().pacing.pause(session.clock());
    }
    Ok(())
}

fn print_outcome(command: &str, outcome: &Result<String, ModemError>, json_output: bool) {
    if json_output {
        let line = match outcome {
            Ok(payload) => json!({ "command": command, "status": "ok", "response": payload }),
            Err(e) => json!({ "command": command, "status": "error", "error": e.to_string() }),
        };
        println!("{}", line);
        return;
    }

    match outcome {
        Ok(payload) if payload.is_empty() => println!("{} -> OK", command),
        Ok(payload) => println!("{} -> OK\n{}", command, payload),
        Err(e) => println!("{} -> {}", command, e),
    }
}

fn print_notification(line: &str, json_output: bool) {
    let now = Local::now();
    if json_output {
        println!(
            "{}",
            json!({ "notification": line, "timestamp": now.to_rfc3339() })
        );
    } else {
        println!("[{}] {}", now.format("%H:%M:%S%.3f"), line);
    }
}
