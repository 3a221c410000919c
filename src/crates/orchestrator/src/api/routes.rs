//! API route table (`§6`).

use crate::api::handlers::{approaches, health, sessions};
use crate::api::state::AppState;
use crate::api::ws::ws_handler;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete API router over `state`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/approaches", post(approaches::create_approach).get(approaches::list_approaches))
        .route("/api/v1/approaches/:folder", get(approaches::get_approach))
        .route("/api/v1/approaches/:folder/graph", get(approaches::get_graph))
        .route("/api/v1/approaches/:folder/sessions", post(sessions::create_session))
        .route("/api/v1/approaches/:folder/sessions/:session_id/turns", post(sessions::post_turn))
        .route("/api/v1/approaches/:folder/sessions/:session_id/cancel", post(sessions::cancel_turn))
        .route("/api/v1/approaches/:folder/sessions/:session_id/auto/start", post(sessions::start_auto))
        .route("/api/v1/approaches/:folder/sessions/:session_id/auto/pause", post(sessions::pause_auto))
        .route("/api/v1/approaches/:folder/sessions/:session_id/auto/resume", post(sessions::resume_auto))
        .route("/api/v1/approaches/:folder/sessions/:session_id/auto/stop", post(sessions::stop_auto))
        .route("/ws/:folder", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
