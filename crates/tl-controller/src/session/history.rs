//! Sliding window of recent temperature samples

use std::collections::VecDeque;

use tl_core::TemperatureSample;

/// Number of samples kept by default
pub const DEFAULT_HISTORY_LEN: usize = 60;

/// Bounded sample history with a monotonically increasing index.
///
/// The index keeps counting across sessions; only the window is bounded.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<TemperatureSample>,
    capacity: usize,
    next_index: u64,
}

impl SampleHistory {
    /// Create an empty history holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            next_index: 0,
        }
    }

    /// Append a reading and return the sample it became
    pub fn record(&mut self, value: f64) -> TemperatureSample {
        let sample = TemperatureSample::new(self.next_index, value);
        self.next_index += 1;

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        sample
    }

    pub fn latest(&self) -> Option<&TemperatureSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemperatureSample> {
        self.samples.iter()
    }

    /// Copy of the window, oldest first
    pub fn to_vec(&self) -> Vec<TemperatureSample> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}
