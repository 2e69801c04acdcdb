//! Session management
//!
//! One task owns the [`SessionManager`]; operators and observers reach it
//! through a [`SessionHandle`].

mod handle;
mod history;
mod manager;
mod threshold;
mod ticker;

pub use handle::{SessionHandle, SessionOp};
pub use history::{SampleHistory, DEFAULT_HISTORY_LEN};
pub use manager::SessionManager;
pub use threshold::ThresholdState;
pub use ticker::Ticker;
