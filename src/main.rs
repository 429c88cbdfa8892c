//! Interaction latency probe for X11 sessions.
//!
//! Injects synthetic pointer input through XTEST, then measures how long
//! the screen takes to visibly react using DAMAGE notifications, logging
//! server-time deltas per probe.

mod cli;
mod config;
mod logger;
mod probe;
mod session;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Command;
use crate::logger::LatencyLogger;
use crate::probe::Probe;
use crate::session::DisplaySession;

fn main() {
    // Diagnostics go to stderr; the measurement log owns stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "xlatency=info,warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", cli::USAGE);
        std::process::exit(1);
    }

    let invocation = match cli::parse(args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("*** {e:#}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(invocation) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(invocation: cli::Invocation) -> Result<()> {
    let cfg = config::Config::load()?;

    let session = DisplaySession::open()?;
    let monitor = cfg
        .monitor
        .map(Into::into)
        .unwrap_or_else(|| session.screen_rect());

    let out = open_log(invocation.log_file.or(cfg.log_file));
    let mut probe = Probe::new(session, LatencyLogger::new(out), monitor, cfg.wait_secs);

    for command in invocation.commands {
        match command {
            Command::Monitor(rect) => probe.set_monitor_rect(rect),
            Command::Wait(secs) => probe.set_wait_timeout(secs),
            Command::Click { x, y } => probe.run_click(x, y)?,
            Command::Drag { points } => probe.run_drag(&points)?,
            Command::Stamp(text) => probe.emit_stamp(&text)?,
            Command::Inspect => {
                let seen = probe.run_inspect()?;
                info!("inspect finished after {seen} damage events");
            }
        }
    }

    Ok(())
}

/// Measurement log sink: the requested file, or stdout. A file that cannot
/// be created is reported and the log falls back to stdout so the probe run
/// is not lost.
fn open_log(path: Option<PathBuf>) -> Box<dyn Write> {
    match path {
        Some(path) => match File::create(&path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                warn!("Failed to create logfile {:?}: {}", path, e);
                Box::new(std::io::stdout())
            }
        },
        None => Box::new(std::io::stdout()),
    }
}
