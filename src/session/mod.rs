//! Call session management
//!
//! This module provides the `CallSession` abstraction that manages:
//! - Binding the inbound audio track and the control channel
//! - Running the turn loop on its own task
//! - Cancellation, teardown and final persistence
//! - Session statistics, and a process-wide `SessionRegistry`

mod config;
mod registry;
mod session;
mod stats;

pub use config::SessionConfig;
pub use registry::SessionRegistry;
pub use session::CallSession;
pub use stats::SessionStats;
