//! Alert Queue and Dispatcher
//!
//! - `types` - the alert wire type
//! - `dispatcher` - the queue, the dispatch loop, and local fan-out

pub mod dispatcher;
pub mod types;

pub use dispatcher::{fan_out_local, spawn_dispatcher, AlertDispatcher, DispatchContext};
pub use types::Alert;
