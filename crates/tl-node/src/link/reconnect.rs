//! Backoff between connection attempts

use std::time::Duration;

use tl_core::config::BackoffConfig;

/// Delay sequence for reconnection attempts.
///
/// With the default configuration (multiplier 1.0, no jitter) every delay
/// equals the initial one. A fresh `Backoff` is made for every round of
/// connection attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    jitter: f64,
}

impl Backoff {
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial, config.max, config.multiplier, config.jitter)
    }

    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            current: initial,
            max: max.max(initial),
            multiplier: multiplier.max(1.0),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Get the next delay and advance
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;

        let next = Duration::from_secs_f64(self.current.as_secs_f64() * self.multiplier);
        self.current = next.min(self.max);

        if self.jitter == 0.0 {
            return delay;
        }
        let jitter_amount = delay.as_secs_f64() * self.jitter * rand::random::<f64>();
        delay + Duration::from_secs_f64(jitter_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_is_fixed() {
        let mut backoff = Backoff::from_config(&BackoffConfig::default());

        for _ in 0..5 {
            assert_eq!(backoff.next_delay(), Duration::from_secs(3));
        }
    }

    #[test]
    fn test_backoff_grows_to_cap() {
        let mut backoff =
            Backoff::new(Duration::from_secs(1), Duration::from_secs(5), 2.0, 0.0);

        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            [1, 2, 4, 5, 5].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn test_backoff_from_growing_config() {
        let config = BackoffConfig {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(3),
            multiplier: 3.0,
            jitter: 0.0,
        };
        let mut backoff = Backoff::from_config(&config);

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut backoff =
            Backoff::new(Duration::from_secs(2), Duration::from_secs(2), 1.0, 0.5);

        for _ in 0..20 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_secs(3));
        }
    }
}
