//! tl-core: Core abstractions and configuration for thermo-link
//!
//! This crate provides the transport layer (TCP stream and UDP datagram
//! variants behind one enum), the role-based [`Channel`] adapter, shared
//! domain types, and the configuration structures used by the controller
//! and the node.

pub mod channel;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use channel::{Channel, Role};
pub use error::{ConfigError, TransportError};
pub use transport::{Delivery, Transport, TransportEvent};
pub use types::{ConnectionState, TemperatureSample, TransportKind};
