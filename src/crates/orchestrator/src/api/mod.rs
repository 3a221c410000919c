//! The HTTP/WebSocket transport (`§6` ambient addition): approach
//! management, chat turns, Auto Mode control, and the per-approach event
//! stream the `orchestrator-server` binary serves.

pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;

pub use routes::create_router;
pub use state::AppState;
