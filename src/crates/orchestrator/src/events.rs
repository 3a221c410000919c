//! The client-facing event stream (`§6`): one JSON object per event, fanned
//! out over a per-approach `tokio::sync::broadcast` channel (`§4.9`) and
//! multiplexed onto each subscriber's WebSocket.

use hypergraph_core::Hypergraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supervisor run state, mirrored to clients on every transition (`§4.8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoState {
    Idle,
    Running,
    Paused,
}

/// One event on an approach's subscription stream. Tagged on `type` with a
/// top-level `timestamp`, matching `§6`'s event table exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Full post-validation graph after a write.
    HypergraphUpdate {
        timestamp: chrono::DateTime<chrono::Utc>,
        path: String,
        graph: Box<Hypergraph>,
        is_incremental: bool,
    },
    /// Streamed assistant text fragment.
    Text {
        timestamp: chrono::DateTime<chrono::Utc>,
        session: String,
        delta: String,
    },
    /// The agent invoked a tool.
    ToolUse {
        timestamp: chrono::DateTime<chrono::Utc>,
        session: String,
        tool_name: String,
        args: Value,
    },
    /// A tool call returned.
    ToolResult {
        timestamp: chrono::DateTime<chrono::Utc>,
        session: String,
        tool_name: String,
        ok: bool,
        summary: Value,
    },
    /// The Auto Mode Supervisor advanced one turn.
    AutoTurn {
        timestamp: chrono::DateTime<chrono::Utc>,
        turn_number: u32,
        max_turns: u32,
    },
    /// The Auto Mode Supervisor changed state.
    AutoStatus {
        timestamp: chrono::DateTime<chrono::Utc>,
        state: AutoState,
    },
    /// Out-of-band, recoverable notice (judge retry exhausted, provider
    /// degraded, etc).
    Warning {
        timestamp: chrono::DateTime<chrono::Utc>,
        message: String,
    },
    /// Out-of-band, unrecoverable notice for this turn/run.
    Error {
        timestamp: chrono::DateTime<chrono::Utc>,
        message: String,
    },
    /// Stream end marker for one turn or run.
    Done {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl OrchestratorEvent {
    pub fn hypergraph_update(path: impl Into<String>, graph: Hypergraph, is_incremental: bool) -> Self {
        Self::HypergraphUpdate {
            timestamp: chrono::Utc::now(),
            path: path.into(),
            graph: Box::new(graph),
            is_incremental,
        }
    }

    pub fn text(session: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::Text {
            timestamp: chrono::Utc::now(),
            session: session.into(),
            delta: delta.into(),
        }
    }

    pub fn tool_use(session: impl Into<String>, tool_name: impl Into<String>, args: Value) -> Self {
        Self::ToolUse {
            timestamp: chrono::Utc::now(),
            session: session.into(),
            tool_name: tool_name.into(),
            args,
        }
    }

    pub fn tool_result(session: impl Into<String>, tool_name: impl Into<String>, ok: bool, summary: Value) -> Self {
        Self::ToolResult {
            timestamp: chrono::Utc::now(),
            session: session.into(),
            tool_name: tool_name.into(),
            ok,
            summary,
        }
    }

    pub fn auto_turn(turn_number: u32, max_turns: u32) -> Self {
        Self::AutoTurn {
            timestamp: chrono::Utc::now(),
            turn_number,
            max_turns,
        }
    }

    pub fn auto_status(state: AutoState) -> Self {
        Self::AutoStatus {
            timestamp: chrono::Utc::now(),
            state,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            timestamp: chrono::Utc::now(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            timestamp: chrono::Utc::now(),
            message: message.into(),
        }
    }

    pub fn done() -> Self {
        Self::Done {
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_snake_case_type_tag() {
        let event = OrchestratorEvent::text("s1", "hello");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["session"], "s1");
        assert_eq!(json["delta"], "hello");
    }

    #[test]
    fn auto_status_serializes_state_as_snake_case() {
        let event = OrchestratorEvent::auto_status(AutoState::Running);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["state"], "running");
    }
}
