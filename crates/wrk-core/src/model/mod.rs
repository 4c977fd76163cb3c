//! Work item identity, lifecycle states, and the embedded session snapshot.

pub mod item;
pub mod session;

pub use item::{Location, Status, StatusReading, WorkItemId, read_status};
pub use session::{DEFAULT_PROGRESS_NOTES, SESSION_STATE_KEY, SessionState};
