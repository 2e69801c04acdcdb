//! tl-controller: Controller daemon for thermo-link
//!
//! The controller binds a TCP or UDP endpoint, waits for a single sensor
//! node, polls it for temperature on a fixed tick and pushes the operator's
//! alarm threshold to it. Observers follow the session through a broadcast
//! stream of [`SessionEvent`]s.

pub mod console;
pub mod error;
pub mod events;
pub mod session;
pub mod state;

pub use error::SessionError;
pub use events::SessionEvent;
pub use session::{SessionHandle, SessionManager};
pub use state::{SessionSnapshot, SessionState};
