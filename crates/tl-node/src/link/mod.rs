//! Outbound link to the controller
//!
//! Dials the controller with a fixed (or configured) backoff between
//! attempts until it answers or the node shuts down.

mod connector;
mod reconnect;

pub use connector::{ConnectionError, Connector};
pub use reconnect::Backoff;
