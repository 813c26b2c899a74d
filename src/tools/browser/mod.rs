//! agent-browser CLI integration
//!
//! One executor drives the session for the navigator and doubles as the live
//! page the capture pipeline inspects.

mod executor;
mod snapshot;

pub use executor::BrowserExecutor;
pub use snapshot::{Element, Snapshot, SnapshotData};
