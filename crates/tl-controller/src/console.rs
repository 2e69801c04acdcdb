//! Line-oriented operator console
//!
//! ```text
//! start tcp | start udp
//! stop
//! threshold <value>
//! status
//! history
//! help
//! quit
//! ```

use thiserror::Error;

use tl_core::TransportKind;
use tl_protocol::parse_number;

use crate::state::SessionSnapshot;

/// One operator request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Start(TransportKind),
    Stop,
    Threshold(f64),
    Status,
    History,
    Help,
    Quit,
}

/// Why an operator line was not understood
#[derive(Error, Debug, PartialEq)]
pub enum ConsoleError {
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),

    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),

    #[error("Invalid argument for '{command}': {value}")]
    InvalidArgument { command: &'static str, value: String },
}

/// Usage text printed by `help`
pub const HELP: &str = "\
commands:
  start tcp|udp      bind the transport and wait for a node
  stop               close the transport
  threshold <value>  set the alarm threshold
  status             show the session state
  history            show recent samples
  quit               shut down";

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match verb.to_ascii_lowercase().as_str() {
        "start" => {
            let value = arg.ok_or(ConsoleError::MissingArgument("start"))?;
            let kind = value
                .parse()
                .map_err(|_| ConsoleError::InvalidArgument {
                    command: "start",
                    value: value.to_string(),
                })?;
            ConsoleCommand::Start(kind)
        }
        "stop" => ConsoleCommand::Stop,
        "threshold" | "set" => {
            let value = arg.ok_or(ConsoleError::MissingArgument("threshold"))?;
            let threshold = parse_number(value).map_err(|_| ConsoleError::InvalidArgument {
                command: "threshold",
                value: value.to_string(),
            })?;
            ConsoleCommand::Threshold(threshold)
        }
        "status" => ConsoleCommand::Status,
        "history" => ConsoleCommand::History,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

/// Human-readable status block
pub fn format_status(snapshot: &SessionSnapshot) -> String {
    let transport = snapshot
        .transport
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "-".to_string());
    let endpoint = snapshot
        .local_addr
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let peer = snapshot
        .peer
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let temperature = snapshot
        .temperature
        .map(|t| format!("{:.1} °C", t))
        .unwrap_or_else(|| "-".to_string());
    let pending = if snapshot.threshold_pending {
        " (pending)"
    } else {
        ""
    };

    format!(
        "state:       {}\ntransport:   {}\nendpoint:    {}\nnode:        {}\ntemperature: {}\nthreshold:   {:.1} °C{}",
        snapshot.state, transport, endpoint, peer, temperature, snapshot.threshold, pending
    )
}

/// One line per sample, oldest first
pub fn format_history(snapshot: &SessionSnapshot) -> String {
    if snapshot.samples.is_empty() {
        return "no samples yet".to_string();
    }
    snapshot
        .samples
        .iter()
        .map(|sample| format!("{:>6}  {:.1}", sample.index, sample.value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_core::{ConnectionState, TemperatureSample};

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse("start udp").unwrap(),
            Some(ConsoleCommand::Start(TransportKind::Datagram))
        );
        assert_eq!(parse("  STOP ").unwrap(), Some(ConsoleCommand::Stop));
        assert_eq!(
            parse("threshold 40").unwrap(),
            Some(ConsoleCommand::Threshold(40.0))
        );
        assert_eq!(parse("quit").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("start"), Err(ConsoleError::MissingArgument("start")));
        assert!(matches!(
            parse("start sctp"),
            Err(ConsoleError::InvalidArgument { command: "start", .. })
        ));
        assert!(matches!(
            parse("threshold warm"),
            Err(ConsoleError::InvalidArgument { .. })
        ));
        assert!(matches!(parse("threshold inf"), Err(_)));
        assert!(matches!(parse("reboot"), Err(ConsoleError::Unknown(_))));
    }

    #[test]
    fn test_format_status_and_history() {
        let snapshot = SessionSnapshot {
            state: ConnectionState::Connected,
            transport: Some(TransportKind::Stream),
            local_addr: Some("0.0.0.0:8080".parse().unwrap()),
            peer: Some("192.168.1.50:40000".parse().unwrap()),
            temperature: Some(42.0),
            threshold: 40.0,
            threshold_pending: true,
            samples: vec![TemperatureSample::new(7, 42.0)],
        };

        let status = format_status(&snapshot);
        assert!(status.contains("connected"));
        assert!(status.contains("192.168.1.50:40000"));
        assert!(status.contains("40.0 °C (pending)"));

        assert_eq!(format_history(&snapshot), "     7  42.0");
    }
}
