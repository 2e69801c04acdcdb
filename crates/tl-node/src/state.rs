//! Node-local state

/// Threshold used until the controller sends one
pub const INITIAL_THRESHOLD: f64 = 50.0;

/// Whether the indicator should be lit
pub fn should_indicate(temperature: f64, threshold: f64) -> bool {
    temperature >= threshold
}

/// What the node currently believes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeState {
    threshold: f64,
    temperature: f64,
    indicator_on: bool,
}

impl NodeState {
    pub fn new() -> Self {
        Self {
            threshold: INITIAL_THRESHOLD,
            temperature: 0.0,
            indicator_on: false,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Last reading taken from the sensor
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn indicator_on(&self) -> bool {
        self.indicator_on
    }

    /// Store a new threshold and return the re-evaluated indicator
    pub fn apply_threshold(&mut self, threshold: f64) -> bool {
        self.threshold = threshold;
        self.evaluate()
    }

    /// Store a new reading and return the re-evaluated indicator
    pub fn apply_reading(&mut self, temperature: f64) -> bool {
        self.temperature = temperature;
        self.evaluate()
    }

    /// Indicator forced off, as on shutdown
    pub fn force_off(&mut self) {
        self.indicator_on = false;
    }

    fn evaluate(&mut self) -> bool {
        self.indicator_on = should_indicate(self.temperature, self.threshold);
        self.indicator_on
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}
