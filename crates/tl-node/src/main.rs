//! thermo-link Node Agent
//!
//! Runs on the sensor board. Connects to the controller, answers
//! temperature polls and drives the indicator LED.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tl_core::config::{NodeConfig, SensorMode, DEFAULT_NODE_CONFIG_PATH};
use tl_core::{ConfigError, TransportKind};
use tl_node::{
    panel, Agent, FixedSource, Indicator, LogicalIndicator, ManualInput, SysfsGpio,
    TemperatureSource, ThermalZone,
};

#[derive(Parser)]
#[command(name = "tl-node")]
#[command(about = "thermo-link node agent - reports temperature and drives the LED")]
#[command(version)]
struct Args {
    /// Controller address (overrides SERVER_IP)
    server_ip: Option<String>,

    /// Path to the KEY=value configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller port (overrides SERVER_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Transport (tcp or udp)
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// GPIO line of the indicator LED
    #[arg(long)]
    gpio: Option<u32>,

    /// Track the indicator without touching GPIO
    #[arg(long)]
    no_gpio: bool,

    /// Temperature source (thermal or manual)
    #[arg(short, long)]
    sensor: Option<SensorMode>,

    /// Report a constant temperature instead of reading a sensor
    #[arg(long, conflicts_with = "sensor")]
    fixed_temp: Option<f64>,

    /// Exit when the controller goes away instead of reconnecting
    #[arg(long)]
    once: bool,

    /// Do not print the LED status panel
    #[arg(short, long)]
    quiet: bool,

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

    // Initialize logging
    let log_level = if args.foreground {
        "debug"
    } else {
        &args.log_level
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("thermo-link node starting...");

    let config = load_config(&args)?;

    let source: Box<dyn TemperatureSource> = match (args.fixed_temp, config.sensor) {
        (Some(temperature), _) => {
            if !temperature.is_finite() {
                anyhow::bail!("Fixed temperature must be a finite number");
            }
            Box::new(FixedSource(temperature))
        }
        (None, SensorMode::Thermal) => Box::new(ThermalZone::from_config(&config)),
        (None, SensorMode::Manual) => Box::new(ManualInput::new(ThermalZone::from_config(&config))),
    };
    let indicator: Box<dyn Indicator> = if args.no_gpio {
        Box::new(LogicalIndicator)
    } else {
        Box::new(SysfsGpio::new(config.led_gpio))
    };

    if !args.quiet {
        println!(
            "{}",
            panel::banner(&config, &source.describe(), &indicator.describe())
        );
    }

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut agent = Agent::new(config, source, indicator).with_panel(!args.quiet);
    agent
        .run(&cancel)
        .await
        .context("Node agent stopped with an error")?;

    tracing::info!("Node shutdown complete");
    Ok(())
}

/// Node configuration file (if any) with command-line overrides applied
fn load_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_default(Path::new(DEFAULT_NODE_CONFIG_PATH))?,
    };

    if let Some(server_ip) = &args.server_ip {
        config.server_ip = server_ip.clone();
    }
    if let Some(port) = args.port {
        config.server_port = Some(port);
    }
    if let Some(transport) = args.transport {
        config.transport = transport;
    }
    if let Some(gpio) = args.gpio {
        config.led_gpio = gpio;
    }
    if let Some(sensor) = args.sensor {
        config.sensor = sensor;
    }
    if args.once {
        config.reconnect = false;
    }

    Ok(config)
}

fn load_default(path: &Path) -> Result<NodeConfig> {
    match NodeConfig::load(path) {
        Ok(config) => {
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        Err(ConfigError::NotFound(_)) => {
            tracing::info!("Using default configuration");
            Ok(NodeConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config from {:?}", path)),
    }
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
