//! Admin HTTP API for operating call sessions
//!
//! - GET /health - Health check
//! - GET /sessions - List live sessions
//! - GET /sessions/:id/status - Query session status
//! - GET /sessions/:id/transcript - Get the conversation so far
//! - POST /sessions/:id/stop - Stop a call

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
