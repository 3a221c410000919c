//! The orchestrator: chat-loop turns, the Auto Mode supervisor, and the
//! per-approach event fan-out that a client-facing transport (the
//! `orchestrator-server` binary) streams over HTTP/WebSocket.
//!
//! This crate never decides a score or an entailment verdict itself — every
//! mutation to a [`hypergraph_core::Hypergraph`] goes through
//! [`tools::dispatch_tool_call`], and the two judgment calls inside it are
//! delegated to `hg_judges`, which never sees chat history (`§9`).

pub mod api;
pub mod approach;
pub mod auto;
pub mod chat_loop;
pub mod config;
pub mod context;
pub mod conversation_log;
pub mod error;
pub mod events;
pub mod session;
pub mod tools;
pub mod watcher;

pub use api::{create_router, AppState};
pub use approach::{ApproachDescriptor, ApproachPaths, Workspace};
pub use auto::AutoSupervisor;
pub use config::{OnFixpoint, OrchestratorConfig, ProviderCredentials};
pub use error::{OrchestratorError, Result};
pub use events::{AutoState, OrchestratorEvent};
pub use session::{Session, TurnGuard};
pub use tools::ToolContext;
pub use watcher::{Fanout, Watcher};
