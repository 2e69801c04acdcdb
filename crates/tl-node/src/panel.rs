//! Console banner and LED status panel

use tl_core::config::NodeConfig;

use crate::state::NodeState;

/// Startup banner
pub fn banner(config: &NodeConfig, sensor: &str, indicator: &str) -> String {
    format!(
        "thermo-link node\n  controller: {} ({})\n  sensor:     {}\n  indicator:  {}",
        config.server_address(),
        config.transport,
        sensor,
        indicator
    )
}

/// One-line LED status shown after every re-evaluation
pub fn status_line(state: &NodeState) -> String {
    let led = if state.indicator_on() { "ON " } else { "OFF" };
    format!(
        "[LED {}] temperature {:>6.1} °C  threshold {:>6.1} °C",
        led,
        state.temperature(),
        state.threshold()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let mut state = NodeState::new();
        state.apply_reading(42.0);
        assert_eq!(
            status_line(&state),
            "[LED OFF] temperature   42.0 °C  threshold   50.0 °C"
        );

        state.apply_threshold(40.0);
        assert!(status_line(&state).starts_with("[LED ON ]"));
    }

    #[test]
    fn test_banner_names_controller() {
        let config = NodeConfig::default();
        let text = banner(&config, "thermal zone", "GPIO 17");

        assert!(text.contains("192.168.1.100:8080 (tcp)"));
        assert!(text.contains("GPIO 17"));
    }
}
