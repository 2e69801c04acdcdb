//! Node configuration
//!
//! The node reads a flat `KEY=value` file, one entry per line. Blank lines
//! and lines starting with `#` are skipped, as are lines without `=`.
//!
//! ```text
//! # /etc/thermo-link/node.conf
//! SERVER_IP=192.168.1.100
//! SERVER_PORT=8080
//! TRANSPORT=tcp
//! LED_GPIO=17
//! ```
//!
//! Reconnection waits `RETRY_SECS` between attempts. Setting
//! `RETRY_MULTIPLIER` above 1 grows the delay up to `RETRY_MAX_SECS`, and
//! `RETRY_JITTER` (0 to 1) adds a random fraction of the delay on top.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::TransportKind;

/// Default location of the node configuration file
pub const DEFAULT_NODE_CONFIG_PATH: &str = "/etc/thermo-link/node.conf";

/// Controller address used when nothing else is configured
pub const DEFAULT_SERVER_IP: &str = "192.168.1.100";

/// GPIO line driving the indicator LED
pub const DEFAULT_LED_GPIO: u32 = 17;

/// SoC thermal zone read by the thermal sensor
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reading reported when no sensor is available
pub const DEFAULT_FALLBACK_TEMPERATURE: f64 = 25.0;

/// Where the node gets its temperature from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorMode {
    /// Read the SoC thermal zone
    #[default]
    Thermal,
    /// Prompt on stdin for every poll
    Manual,
}

impl FromStr for SensorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thermal" | "auto" => Ok(Self::Thermal),
            "manual" | "stdin" => Ok(Self::Manual),
            other => Err(format!("unknown sensor '{}' (expected thermal or manual)", other)),
        }
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thermal => write!(f, "thermal"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Reconnection backoff configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Initial delay
    pub initial: Duration,

    /// Maximum delay
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl BackoffConfig {
    /// A constant delay between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(3))
    }
}

/// Configuration for the sensor node agent
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Controller host or IP address
    pub server_ip: String,

    /// Controller port; `None` means the transport's well-known port
    pub server_port: Option<u16>,

    /// Transport used to reach the controller
    pub transport: TransportKind,

    /// GPIO line of the indicator LED
    pub led_gpio: u32,

    /// Temperature source
    pub sensor: SensorMode,

    /// Thermal zone file (millidegrees Celsius)
    pub thermal_zone: PathBuf,

    /// Reading used when the sensor is unavailable
    pub fallback_temperature: f64,

    /// Reconnect after the controller goes away instead of exiting
    pub reconnect: bool,

    /// Delay between connection attempts
    pub backoff: BackoffConfig,

    /// Timeout for a single connection attempt
    pub connect_timeout: Duration,

    /// How long a datagram node waits for a command before re-announcing
    pub announce_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            server_ip: DEFAULT_SERVER_IP.to_string(),
            server_port: None,
            transport: TransportKind::Stream,
            led_gpio: DEFAULT_LED_GPIO,
            sensor: SensorMode::Thermal,
            thermal_zone: PathBuf::from(DEFAULT_THERMAL_ZONE),
            fallback_temperature: DEFAULT_FALLBACK_TEMPERATURE,
            reconnect: true,
            backoff: BackoffConfig::default(),
            connect_timeout: Duration::from_secs(10),
            announce_interval: Duration::from_secs(5),
        }
    }
}

impl NodeConfig {
    /// Load a `KEY=value` file on top of the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

        Self::from_key_values(&content)
    }

    /// Parse `KEY=value` text on top of the defaults
    pub fn from_key_values(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_key_values(text)?;
        Ok(config)
    }

    /// Apply `KEY=value` text to this configuration
    pub fn apply_key_values(&mut self, text: &str) -> Result<(), ConfigError> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            self.apply(key.trim(), value.trim())?;
        }

        // A constant delay has no cap of its own; a growing one never starts above it
        self.backoff.max = if self.backoff.multiplier > 1.0 {
            self.backoff.max.max(self.backoff.initial)
        } else {
            self.backoff.initial
        };
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "SERVER_IP" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.server_ip = value.to_string();
            }
            "SERVER_PORT" => self.server_port = Some(value.parse().map_err(|_| invalid())?),
            "TRANSPORT" => self.transport = value.parse().map_err(|_| invalid())?,
            "LED_GPIO" => self.led_gpio = value.parse().map_err(|_| invalid())?,
            "SENSOR" => self.sensor = value.parse().map_err(|_| invalid())?,
            "THERMAL_ZONE" => self.thermal_zone = PathBuf::from(value),
            "FALLBACK_TEMP" => {
                let temp: f64 = value.parse().map_err(|_| invalid())?;
                if !temp.is_finite() {
                    return Err(invalid());
                }
                self.fallback_temperature = temp;
            }
            "RECONNECT" => self.reconnect = parse_bool(value).ok_or_else(invalid)?,
            "RETRY_SECS" => {
                self.backoff.initial = Duration::from_secs(value.parse().map_err(|_| invalid())?)
            }
            "RETRY_MAX_SECS" => {
                self.backoff.max = Duration::from_secs(value.parse().map_err(|_| invalid())?)
            }
            "RETRY_MULTIPLIER" => {
                let multiplier: f64 = value.parse().map_err(|_| invalid())?;
                if !multiplier.is_finite() || multiplier < 1.0 {
                    return Err(invalid());
                }
                self.backoff.multiplier = multiplier;
            }
            "RETRY_JITTER" => {
                let jitter: f64 = value.parse().map_err(|_| invalid())?;
                if !(0.0..=1.0).contains(&jitter) {
                    return Err(invalid());
                }
                self.backoff.jitter = jitter;
            }
            "CONNECT_TIMEOUT_SECS" => {
                self.connect_timeout = Duration::from_secs(value.parse().map_err(|_| invalid())?)
            }
            "ANNOUNCE_SECS" => {
                self.announce_interval = Duration::from_secs(value.parse().map_err(|_| invalid())?)
            }
            other => tracing::debug!("Ignoring unknown config key {}", other),
        }
        Ok(())
    }

    /// Effective controller port
    pub fn port(&self) -> u16 {
        self.server_port
            .unwrap_or_else(|| self.transport.default_port())
    }

    /// `host:port` string to dial
    pub fn server_address(&self) -> String {
        if self.server_ip.contains(':') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.server_ip, self.port())
        } else {
            format!("{}:{}", self.server_ip, self.port())
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
