//! Chat session and Auto Mode control endpoints (`§4.5`, `§4.8`).

use crate::api::error::{ApiError, ApiResult};
use crate::api::response;
use crate::api::state::AppState;
use crate::auto::AutoSupervisor;
use crate::chat_loop;
use crate::error::OrchestratorError;
use crate::session::Session;
use axum::extract::{Path as AxumPath, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

fn session_key(folder: &str, session_id: &str) -> String {
    format!("{folder}/{session_id}")
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
}

/// `POST /api/v1/approaches/:folder/sessions`
///
/// Creates a new chat session (or, with a supplied id, re-attaches one that
/// was already created, replaying its conversation log, `§4.5` step 5).
pub async fn create_session(State(state): State<AppState>, AxumPath(folder): AxumPath<String>, body: Option<Json<serde_json::Value>>) -> ApiResult<impl IntoResponse> {
    let paths = state.workspace.paths(&folder).map_err(|_| ApiError::NotFound(folder.clone()))?;
    if !paths.descriptor_json().exists() {
        return Err(ApiError::NotFound(folder));
    }

    let session_id = body
        .as_ref()
        .and_then(|b| b.get("session_id"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let key = session_key(&folder, &session_id);
    if let Some(existing) = state.sessions.get(&key) {
        existing.resume().await.map_err(ApiError::from)?;
        return Ok(response::ok(SessionCreated { session_id }));
    }

    let session = std::sync::Arc::new(Session::new(session_id.clone(), &state.config.chat_model_id, paths.conversation_log(&session_id)));
    session.resume().await.map_err(ApiError::from)?;
    state.sessions.insert(key, session);
    Ok(response::ok(SessionCreated { session_id }))
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

/// `POST /api/v1/approaches/:folder/sessions/:session_id/turns`
///
/// Enqueues one user turn. Runs the turn in the background; progress and
/// the final result are delivered on the approach's event stream
/// (`/ws/:folder`), not in this response (`§4.5`).
pub async fn post_turn(
    State(state): State<AppState>,
    AxumPath((folder, session_id)): AxumPath<(String, String)>,
    Json(req): Json<TurnRequest>,
) -> ApiResult<impl IntoResponse> {
    let paths = state.workspace.paths(&folder).map_err(|_| ApiError::NotFound(folder.clone()))?;
    let key = session_key(&folder, &session_id);
    let session = state.sessions.get(&key).map(|s| s.clone()).ok_or_else(|| ApiError::NotFound(key.clone()))?;

    let (cancellation, guard) = session.begin_turn().map_err(ApiError::from)?;
    let tool_ctx = state.tool_context(paths.root());
    let model = state.chat_model.clone();
    let config = state.config.clone();
    let events_tx = state.fanout.channel(paths.root());

    tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = chat_loop::run_turn(session, model, tool_ctx, config, events_tx, cancellation, req.text).await {
            tracing::warn!(error = %e, "chat turn ended with an error");
        }
    });

    Ok(response::ok(serde_json::json!({ "accepted": true })))
}

/// `POST /api/v1/approaches/:folder/sessions/:session_id/cancel`
pub async fn cancel_turn(State(state): State<AppState>, AxumPath((folder, session_id)): AxumPath<(String, String)>) -> ApiResult<impl IntoResponse> {
    let key = session_key(&folder, &session_id);
    let session = state.sessions.get(&key).map(|s| s.clone()).ok_or_else(|| ApiError::NotFound(key))?;
    session.cancel();
    Ok(response::no_content())
}

/// `POST /api/v1/approaches/:folder/auto/start`
///
/// Starts the Auto Mode Supervisor for a session (`§4.8`). A no-op if Auto
/// Mode is already running for this session.
pub async fn start_auto(State(state): State<AppState>, AxumPath((folder, session_id)): AxumPath<(String, String)>) -> ApiResult<impl IntoResponse> {
    let paths = state.workspace.paths(&folder).map_err(|_| ApiError::NotFound(folder.clone()))?;
    let key = session_key(&folder, &session_id);

    if state.auto_supervisors.contains_key(&key) {
        return Ok(response::ok(serde_json::json!({ "already_running": true })));
    }

    let session = state
        .sessions
        .get(&key)
        .map(|s| s.clone())
        .ok_or_else(|| ApiError::Orchestrator(OrchestratorError::UnknownApproach(key.clone())))?;
    let tool_ctx = state.tool_context(paths.root());
    let events_tx = state.fanout.channel(paths.root());

    let supervisor = AutoSupervisor::new(session, state.auto_model.clone(), tool_ctx, state.config.clone(), events_tx);
    state.auto_supervisors.insert(key.clone(), supervisor.clone());

    let supervisors = state.auto_supervisors.clone();
    tokio::spawn(async move {
        let _ = supervisor.run().await;
        supervisors.remove(&key);
    });

    Ok(response::ok(serde_json::json!({ "started": true })))
}

async fn control_auto(state: &AppState, folder: &str, session_id: &str, f: impl FnOnce(&AutoSupervisor) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>>) -> ApiResult<()> {
    let key = session_key(folder, session_id);
    let supervisor = state.auto_supervisors.get(&key).map(|s| s.clone()).ok_or_else(|| ApiError::NotFound(key))?;
    f(&supervisor).await;
    Ok(())
}

/// `POST /api/v1/approaches/:folder/auto/pause`
pub async fn pause_auto(State(state): State<AppState>, AxumPath((folder, session_id)): AxumPath<(String, String)>) -> ApiResult<impl IntoResponse> {
    control_auto(&state, &folder, &session_id, |s| Box::pin(async move { s.pause() })).await?;
    Ok(response::no_content())
}

/// `POST /api/v1/approaches/:folder/auto/resume`
pub async fn resume_auto(State(state): State<AppState>, AxumPath((folder, session_id)): AxumPath<(String, String)>) -> ApiResult<impl IntoResponse> {
    control_auto(&state, &folder, &session_id, |s| Box::pin(async move { s.resume() })).await?;
    Ok(response::no_content())
}

/// `POST /api/v1/approaches/:folder/auto/stop`
pub async fn stop_auto(State(state): State<AppState>, AxumPath((folder, session_id)): AxumPath<(String, String)>) -> ApiResult<impl IntoResponse> {
    control_auto(&state, &folder, &session_id, |s| Box::pin(async move { s.stop().await })).await?;
    Ok(response::no_content())
}
