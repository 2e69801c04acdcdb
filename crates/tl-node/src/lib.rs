//! tl-node: Sensor node agent for thermo-link
//!
//! The node connects out to the controller, answers temperature polls from
//! its sensor, accepts threshold updates and lights the indicator LED while
//! the temperature is at or above the threshold.

pub mod agent;
pub mod indicator;
pub mod link;
pub mod panel;
pub mod sensor;
pub mod state;

pub use agent::{Agent, SessionEnd};
pub use indicator::{Actuator, Indicator, IndicatorError, LogicalIndicator, SysfsGpio};
pub use link::{Backoff, ConnectionError, Connector};
pub use sensor::{FixedSource, ManualInput, SensorError, TemperatureSource, ThermalZone};
pub use state::NodeState;
