//! tl-protocol: Wire protocol for thermo-link telemetry
//!
//! This crate defines the newline-delimited text protocol spoken between the
//! controller and a sensor node, over either a TCP stream or UDP datagrams.

pub mod codec;
pub mod command;
pub mod error;
pub mod number;
pub mod parser;

pub use codec::{LineCodec, MAX_LINE_LENGTH};
pub use command::{Command, ANNOUNCE_LINE, GET_TEMP, SET_THRESHOLD};
pub use error::ProtocolError;
pub use number::{format_reading, format_threshold, parse_number};
pub use parser::{CommandParser, Incoming};
