//! Execution session controller.
//!
//! Drives one skill execution at a time from prompt submission to a
//! terminal status, folding transport stream events into an append-only
//! output buffer and offering cooperative cancellation.

pub mod controller;
pub mod session;

pub use controller::{ControllerConfig, ExecuteError, SessionController};
pub use session::ExecutionSession;
