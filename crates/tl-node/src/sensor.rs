//! Temperature sources

use std::io::BufRead;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use tl_core::config::NodeConfig;
use tl_protocol::parse_number;

/// Sensor errors
#[derive(Debug, Error)]
pub enum SensorError {
    /// The reading could not be interpreted as a temperature
    #[error("Invalid reading: {0:?}")]
    InvalidReading(String),
}

/// Something that produces temperatures in degrees Celsius
#[async_trait]
pub trait TemperatureSource: Send {
    async fn read(&mut self) -> Result<f64, SensorError>;

    /// Short description for logs and the banner
    fn describe(&self) -> String;
}

/// SoC thermal zone, reported in millidegrees Celsius.
///
/// When the zone cannot be read, the fallback temperature is reported
/// instead.
#[derive(Debug, Clone)]
pub struct ThermalZone {
    path: PathBuf,
    fallback: f64,
    warned: bool,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>, fallback: f64) -> Self {
        Self {
            path: path.into(),
            fallback,
            warned: false,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.thermal_zone.clone(), config.fallback_temperature)
    }

    async fn read_zone(&self) -> Result<f64, String> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| e.to_string())?;
        let millidegrees = parse_number(&raw).map_err(|e| e.to_string())?;
        if millidegrees <= 0.0 {
            return Err(format!("zone reports {} millidegrees", millidegrees));
        }
        Ok(millidegrees / 1000.0)
    }
}

#[async_trait]
impl TemperatureSource for ThermalZone {
    async fn read(&mut self) -> Result<f64, SensorError> {
        match self.read_zone().await {
            Ok(celsius) => Ok(celsius),
            Err(e) => {
                if !self.warned {
                    tracing::warn!(
                        "Cannot read {:?} ({}), reporting {:.1} °C",
                        self.path,
                        e,
                        self.fallback
                    );
                    self.warned = true;
                }
                Ok(self.fallback)
            }
        }
    }

    fn describe(&self) -> String {
        format!("thermal zone {}", self.path.display())
    }
}

/// Operator types a temperature for every poll.
///
/// Blank input, `auto` or end of input defer to the thermal zone.
pub struct ManualInput {
    lines: Option<mpsc::Receiver<String>>,
    thermal: ThermalZone,
}

impl ManualInput {
    pub fn new(thermal: ThermalZone) -> Self {
        Self {
            lines: None,
            thermal,
        }
    }

    /// Input from an arbitrary line channel instead of stdin
    pub fn from_channel(lines: mpsc::Receiver<String>, thermal: ThermalZone) -> Self {
        Self {
            lines: Some(lines),
            thermal,
        }
    }

    async fn next_line(&mut self) -> Option<String> {
        let lines = self.lines.get_or_insert_with(spawn_stdin_reader);
        lines.recv().await
    }
}

#[async_trait]
impl TemperatureSource for ManualInput {
    async fn read(&mut self) -> Result<f64, SensorError> {
        eprint!("temperature (blank for sensor): ");

        let Some(line) = self.next_line().await else {
            return self.thermal.read().await;
        };
        let input = line.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("auto") {
            return self.thermal.read().await;
        }

        parse_number(input).map_err(|_| SensorError::InvalidReading(input.to_string()))
    }

    fn describe(&self) -> String {
        format!("manual input (fallback {})", self.thermal.describe())
    }
}

/// Stdin is read on a detached thread so a pending read never blocks shutdown
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Always reports the same temperature
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

#[async_trait]
impl TemperatureSource for FixedSource {
    async fn read(&mut self) -> Result<f64, SensorError> {
        Ok(self.0)
    }

    fn describe(&self) -> String {
        format!("fixed {:.1} °C", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_thermal_zone_millidegrees() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");
        std::fs::write(&path, "47312\n").unwrap();

        let mut zone = ThermalZone::new(&path, 25.0);
        assert_eq!(zone.read().await.unwrap(), 47.312);
    }

    #[tokio::test]
    async fn test_thermal_zone_fallback() {
        let dir = tempfile::tempdir().unwrap();

        let mut missing = ThermalZone::new(dir.path().join("absent"), 25.0);
        assert_eq!(missing.read().await.unwrap(), 25.0);

        let garbage = dir.path().join("temp");
        std::fs::write(&garbage, "n/a").unwrap();
        let mut zone = ThermalZone::new(&garbage, 25.0);
        assert_eq!(zone.read().await.unwrap(), 25.0);
    }

    #[tokio::test]
    async fn test_thermal_zone_non_positive_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");

        let mut zone = ThermalZone::new(&path, 25.0);
        for raw in ["0\n", "-5000"] {
            std::fs::write(&path, raw).unwrap();
            assert_eq!(zone.read().await.unwrap(), 25.0);
        }

        std::fs::write(&path, "1000\n").unwrap();
        assert_eq!(zone.read().await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_manual_input() {
        let dir = tempfile::tempdir().unwrap();
        let thermal = ThermalZone::new(dir.path().join("absent"), 25.0);

        let (tx, rx) = mpsc::channel(8);
        let mut source = ManualInput::from_channel(rx, thermal);

        for line in ["42.5", "", "auto", "warm"] {
            tx.send(line.to_string()).await.unwrap();
        }

        assert_eq!(source.read().await.unwrap(), 42.5);
        assert_eq!(source.read().await.unwrap(), 25.0);
        assert_eq!(source.read().await.unwrap(), 25.0);
        assert!(matches!(
            source.read().await,
            Err(SensorError::InvalidReading(_))
        ));

        // End of input falls back to the sensor
        drop(tx);
        assert_eq!(source.read().await.unwrap(), 25.0);
    }
}
