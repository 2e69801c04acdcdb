//! thermo-link Controller Daemon
//!
//! Waits for a sensor node, polls it for temperature and pushes the alarm
//! threshold. An operator console on stdin drives the session.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tl_controller::console::{self, ConsoleCommand};
use tl_controller::{SessionEvent, SessionHandle, SessionManager};
use tl_core::config::{self, ControllerConfig};
use tl_core::TransportKind;

/// How session events are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EventFormat {
    /// Through the log
    Log,
    /// One JSON object per line on stdout
    Json,
}

#[derive(Parser)]
#[command(name = "tl-controller")]
#[command(about = "thermo-link controller daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transport to start with (tcp or udp)
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Bind address for the selected transport (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Initial alarm threshold in degrees Celsius
    #[arg(long)]
    threshold: Option<f64>,

    /// Poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Wait for 'start' on the console instead of binding at launch
    #[arg(long)]
    no_auto_start: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,

    /// Session event output
    #[arg(long, value_enum, default_value = "log")]
    events: EventFormat,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout may carry JSON events, so logs go to stderr
    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("thermo-link controller starting...");

    let config = load_config(&args)?;

    if let Some(path) = &args.write_config {
        config::save_config(path, &config)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        tracing::info!("Configuration written to {:?}", path);
        return Ok(());
    }

    let transport = config.transport;
    let auto_start = config.auto_start;

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let manager = SessionManager::new(config);
    let events = manager.subscribe();
    let (handle, session_task) = SessionHandle::spawn(manager, cancel.clone());

    tokio::spawn(report_events(events, args.events));

    if auto_start {
        if let Err(e) = handle.start(transport).await {
            tracing::warn!("{}; use 'start tcp|udp' to retry", e);
        }
    }

    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = run_console(&handle, &cancel) => {}
    }

    cancel.cancel();
    session_task.await.context("Session task failed")?;

    tracing::info!("Controller shutdown complete");
    Ok(())
}

/// Configuration file (if any) with command-line overrides applied
fn load_config(args: &Args) -> Result<ControllerConfig> {
    let mut config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                ControllerConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            ControllerConfig::default()
        }
    };

    if let Some(transport) = args.transport {
        config.transport = transport;
    }
    if let Some(bind) = &args.bind {
        match config.transport {
            TransportKind::Stream => config.stream_bind = bind.clone(),
            TransportKind::Datagram => config.datagram_bind = bind.clone(),
        }
    }
    if let Some(threshold) = args.threshold {
        if !threshold.is_finite() {
            anyhow::bail!("Threshold must be a finite number");
        }
        config.initial_threshold = threshold;
    }
    if let Some(poll_ms) = args.poll_ms {
        config.poll_interval = Duration::from_millis(poll_ms.max(1));
    }
    if args.no_auto_start {
        config.auto_start = false;
    }

    Ok(config)
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel.cancel();
    });
}

/// Mirror session events to the log or to stdout as JSON lines
async fn report_events(mut events: broadcast::Receiver<SessionEvent>, format: EventFormat) {
    loop {
        match events.recv().await {
            Ok(event) => match format {
                EventFormat::Json => match serde_json::to_string(&event) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::warn!("Failed to encode event: {}", e),
                },
                EventFormat::Log => log_event(&event),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Event reporter lagged, skipped {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::TemperatureChanged { value } => {
            tracing::info!("Temperature: {:.1} °C", value)
        }
        SessionEvent::ThresholdChanged { value } => {
            tracing::info!("Threshold changed to {:.1} °C", value)
        }
        SessionEvent::StateChanged { state, peer } => match peer {
            Some(peer) => tracing::info!("Session {} ({})", state, peer),
            None => tracing::info!("Session {}", state),
        },
        SessionEvent::SampleRecorded { sample } => {
            tracing::debug!("Sample #{}: {}", sample.index, sample.value)
        }
        SessionEvent::BindFailed {
            transport,
            addr,
            reason,
        } => tracing::error!("Could not bind {} on {}: {}", transport, addr, reason),
        SessionEvent::PeerRejected { addr } => {
            tracing::warn!("Rejected extra node from {}", addr)
        }
    }
}

/// Feed stdin lines into a channel.
///
/// Runs on a detached thread: a blocked stdin read must not hold up runtime
/// shutdown.
fn spawn_console_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Console input error: {}", e);
                    break;
                }
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Read operator commands from stdin until `quit` or end of input
async fn run_console(handle: &SessionHandle, cancel: &CancellationToken) {
    let mut lines = spawn_console_reader();

    while let Some(line) = lines.recv().await {
        let command = match console::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        if command == ConsoleCommand::Quit {
            cancel.cancel();
            return;
        }
        if let Err(e) = execute(handle, command).await {
            eprintln!("{}", e);
        }
    }

    // No console attached; keep running until a signal arrives
    tracing::debug!("Console input closed");
    cancel.cancelled().await;
}

async fn execute(handle: &SessionHandle, command: ConsoleCommand) -> Result<()> {
    match command {
        ConsoleCommand::Start(kind) => {
            let addr = handle.start(kind).await?;
            eprintln!("listening on {} ({})", addr, kind);
        }
        ConsoleCommand::Stop => handle.stop().await?,
        ConsoleCommand::Threshold(value) => {
            if !handle.set_threshold(value).await? {
                eprintln!("threshold already {:.1}", value);
            }
        }
        ConsoleCommand::Status => {
            let snapshot = handle.snapshot().await?;
            eprintln!("{}", console::format_status(&snapshot));
        }
        ConsoleCommand::History => {
            let snapshot = handle.snapshot().await?;
            eprintln!("{}", console::format_history(&snapshot));
        }
        ConsoleCommand::Help => eprintln!("{}", console::HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}
