//! Indicator LED output
//!
//! [`SysfsGpio`] drives a GPIO line through the legacy sysfs interface:
//!
//! ```text
//! echo 17  > /sys/class/gpio/export
//! echo out > /sys/class/gpio/gpio17/direction
//! echo 1   > /sys/class/gpio/gpio17/value
//! echo 17  > /sys/class/gpio/unexport
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Root of the sysfs GPIO interface
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Time udev needs to set up permissions on a freshly exported line
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

/// Indicator errors
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Writing a sysfs attribute failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `set` was called before a successful `init`
    #[error("Indicator not initialised")]
    NotInitialized,
}

/// A boolean output device
pub trait Indicator: Send {
    /// Prepare the device for output
    fn init(&mut self) -> Result<(), IndicatorError>;

    /// Switch the output on or off
    fn set(&mut self, on: bool) -> Result<(), IndicatorError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// GPIO line driven through sysfs
#[derive(Debug)]
pub struct SysfsGpio {
    line: u32,
    root: PathBuf,
    exported: bool,
}

impl SysfsGpio {
    pub fn new(line: u32) -> Self {
        Self::with_root(line, SYSFS_GPIO_ROOT)
    }

    /// Use a different sysfs root (tests point this at a scratch directory)
    pub fn with_root(line: u32, root: impl Into<PathBuf>) -> Self {
        Self {
            line,
            root: root.into(),
            exported: false,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    fn line_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.line))
    }

    fn write(path: &Path, value: &str) -> Result<(), IndicatorError> {
        std::fs::write(path, value).map_err(|source| IndicatorError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Indicator for SysfsGpio {
    fn init(&mut self) -> Result<(), IndicatorError> {
        if !self.line_dir().exists() {
            Self::write(&self.root.join("export"), &self.line.to_string())?;
            std::thread::sleep(EXPORT_SETTLE);
        }
        self.exported = true;

        Self::write(&self.line_dir().join("direction"), "out")?;
        tracing::debug!("GPIO {} exported as output", self.line);
        Ok(())
    }

    fn set(&mut self, on: bool) -> Result<(), IndicatorError> {
        if !self.exported {
            return Err(IndicatorError::NotInitialized);
        }
        Self::write(&self.line_dir().join("value"), if on { "1" } else { "0" })
    }

    fn describe(&self) -> String {
        format!("GPIO {}", self.line)
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        if !self.exported {
            return;
        }
        if let Err(e) = Self::write(&self.root.join("unexport"), &self.line.to_string()) {
            tracing::debug!("Failed to unexport GPIO {}: {}", self.line, e);
        }
    }
}

/// Indicator with no hardware behind it
#[derive(Debug, Default)]
pub struct LogicalIndicator;

impl Indicator for LogicalIndicator {
    fn init(&mut self) -> Result<(), IndicatorError> {
        Ok(())
    }

    fn set(&mut self, on: bool) -> Result<(), IndicatorError> {
        tracing::trace!("Indicator {}", if on { "ON" } else { "OFF" });
        Ok(())
    }

    fn describe(&self) -> String {
        "logical indicator".to_string()
    }
}

/// Keeps the logical indicator state and mirrors it to hardware when the
/// hardware is available.
pub struct Actuator {
    indicator: Box<dyn Indicator>,
    available: bool,
    on: bool,
}

impl Actuator {
    pub fn new(indicator: Box<dyn Indicator>) -> Self {
        Self {
            indicator,
            available: false,
            on: false,
        }
    }

    /// Initialise the device and switch it off.
    ///
    /// Returns `false` when the device is unusable; the actuator then keeps
    /// tracking state without touching hardware.
    pub fn init(&mut self) -> bool {
        match self.indicator.init() {
            Ok(()) => {
                self.available = true;
                tracing::info!("Indicator ready on {}", self.indicator.describe());
                self.set(false);
            }
            Err(e) => {
                self.available = false;
                tracing::warn!(
                    "{} unavailable ({}), continuing without a physical LED",
                    self.indicator.describe(),
                    e
                );
            }
        }
        self.available
    }

    pub fn set(&mut self, on: bool) {
        self.on = on;
        if !self.available {
            return;
        }
        if let Err(e) = self.indicator.set(on) {
            tracing::warn!("Failed to drive {}: {}", self.indicator.describe(), e);
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_gpio(line: u32) -> (tempfile::TempDir, SysfsGpio) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(format!("gpio{}", line))).unwrap();
        let gpio = SysfsGpio::with_root(line, dir.path());
        (dir, gpio)
    }

    #[test]
    fn test_sysfs_gpio_writes_attributes() {
        let (dir, mut gpio) = scratch_gpio(17);
        let line_dir = dir.path().join("gpio17");

        gpio.init().unwrap();
        assert_eq!(std::fs::read_to_string(line_dir.join("direction")).unwrap(), "out");

        gpio.set(true).unwrap();
        assert_eq!(std::fs::read_to_string(line_dir.join("value")).unwrap(), "1");
        gpio.set(false).unwrap();
        assert_eq!(std::fs::read_to_string(line_dir.join("value")).unwrap(), "0");

        drop(gpio);
        assert_eq!(std::fs::read_to_string(dir.path().join("unexport")).unwrap(), "17");
    }

    #[test]
    fn test_sysfs_gpio_requires_init() {
        let (_dir, mut gpio) = scratch_gpio(4);
        assert!(matches!(gpio.set(true), Err(IndicatorError::NotInitialized)));
    }

    #[test]
    fn test_actuator_degrades_without_hardware() {
        let missing = tempfile::tempdir().unwrap();
        let gpio = SysfsGpio::with_root(17, missing.path().join("absent"));
        let mut actuator = Actuator::new(Box::new(gpio));

        assert!(!actuator.init());
        actuator.set(true);

        assert!(actuator.is_on());
        assert!(!actuator.is_available());
    }

    #[test]
    fn test_actuator_init_switches_off() {
        let (dir, gpio) = scratch_gpio(22);
        let mut actuator = Actuator::new(Box::new(gpio));

        assert!(actuator.init());
        assert!(!actuator.is_on());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("gpio22").join("value")).unwrap(),
            "0"
        );
    }
}
