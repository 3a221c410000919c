//! The `/ws/:folder` upgrade endpoint (`§4.9`): one ordered event stream per
//! approach, mixing `hypergraph_update` and chat/auto events, with a
//! ping/pong keepalive so a dead connection is noticed promptly.

use crate::api::state::AppState;
use crate::events::OrchestratorEvent;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path as AxumPath, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::interval;

const PING_INTERVAL: Duration = Duration::from_secs(20);
/// Disconnect a client that hasn't sent us anything — not even a `Pong` —
/// for this long, mirroring the teacher's `ClientTimeout`/`idle_seconds`
/// heartbeat tracking. A client that stops reading/writing without ever
/// sending `Close` (a dead peer, a network partition, a buggy client that
/// never answers our pings) would otherwise sit in `events.recv()` forever.
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Per-connection last-activity tracker, scoped to one `handle_socket`
/// task rather than a shared registry (each connection already owns its
/// state via a local `mut` variable, so there is no need for the teacher's
/// `DashMap`-keyed `TimeoutManager` here).
struct ConnectionActivity(Instant);

impl ConnectionActivity {
    fn new() -> Self {
        Self(Instant::now())
    }

    fn record_activity(&mut self) {
        self.0 = Instant::now();
    }

    fn idle_elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    fn is_idle(&self, timeout: Duration) -> bool {
        self.idle_elapsed() > timeout
    }
}

/// `GET /ws/:folder`
pub async fn ws_handler(State(state): State<AppState>, AxumPath(folder): AxumPath<String>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, folder))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, folder: String) {
    let paths = match state.workspace.paths(&folder) {
        Ok(paths) => paths,
        Err(e) => {
            let _ = socket.send(Message::Text(format!("{{\"error\":\"{e}\"}}"))).await;
            return;
        }
    };

    state.ensure_approach_active(paths.root());
    let mut events = state.fanout.subscribe(paths.root());
    state.watcher.send_initial_snapshot(paths.root());

    let mut ping_tick = interval(PING_INTERVAL);
    let mut activity = ConnectionActivity::new();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(folder = %folder, skipped, "client lagged behind the event stream");
                        let warning = OrchestratorEvent::warning(format!("dropped {skipped} events; state may be stale, refetch the graph"));
                        if send_event(&mut socket, &warning).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = ping_tick.tick() => {
                if activity.is_idle(IDLE_TIMEOUT) {
                    tracing::warn!(folder = %folder, idle_secs = activity.idle_elapsed().as_secs(), "client idle past timeout, disconnecting");
                    break;
                }
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    // Any inbound frame counts as activity, including the
                    // `Pong` replies to our own pings.
                    Some(Ok(_)) => activity.record_activity(),
                    Some(Err(_)) => break,
                }
            }
        }
    }

    tracing::debug!(folder = %folder, "websocket client disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &OrchestratorEvent) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\":\"serialize failure: {e}\"}}"));
    socket.send(Message::Text(text)).await
}
