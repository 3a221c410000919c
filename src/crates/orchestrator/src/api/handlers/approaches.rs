//! Approach management and graph-snapshot endpoints (`§6`).

use crate::api::error::{ApiError, ApiResult};
use crate::api::response;
use crate::api::state::AppState;
use crate::approach::ApproachDescriptor;
use axum::extract::{Path as AxumPath, State};
use axum::response::IntoResponse;
use axum::Json;
use hypergraph_core::{Claim, Store, HYPOTHESIS_ID};
use serde::Deserialize;

/// `GET /api/v1/approaches`
pub async fn list_approaches(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let names = state.workspace.list_approaches().map_err(ApiError::from)?;
    Ok(response::ok(names))
}

#[derive(Debug, Deserialize)]
pub struct CreateApproachRequest {
    pub folder: String,
    pub display_name: String,
    pub original_hypothesis: String,
}

/// `POST /api/v1/approaches`
pub async fn create_approach(State(state): State<AppState>, Json(req): Json<CreateApproachRequest>) -> ApiResult<impl IntoResponse> {
    let descriptor = ApproachDescriptor {
        folder: req.folder,
        display_name: req.display_name,
        original_hypothesis: req.original_hypothesis,
    };
    let paths = state.workspace.create_approach(descriptor.clone()).map_err(ApiError::from)?;

    let store = Store::open(paths.root()).with_history_retention(state.config.history_retention_depth);
    store
        .init(&descriptor.display_name, &descriptor.original_hypothesis)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    // `init` only writes the empty graph shell; seed the root hypothesis
    // claim from the request so every approach starts with invariant 7
    // already satisfied (a claim with id `HYPOTHESIS_ID`).
    store
        .add_claim(Claim::new(HYPOTHESIS_ID, descriptor.original_hypothesis.clone()))
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(response::created(descriptor))
}

/// `GET /api/v1/approaches/:folder`
pub async fn get_approach(State(state): State<AppState>, AxumPath(folder): AxumPath<String>) -> ApiResult<impl IntoResponse> {
    let descriptor = state.workspace.load_descriptor(&folder).map_err(|_| ApiError::NotFound(folder))?;
    Ok(response::ok(descriptor))
}

/// `GET /api/v1/approaches/:folder/graph`
///
/// Returns the current hypergraph plus its validation report. This is the
/// same snapshot a newly-subscribed WebSocket client receives on connect.
pub async fn get_graph(State(state): State<AppState>, AxumPath(folder): AxumPath<String>) -> ApiResult<impl IntoResponse> {
    let paths = state.workspace.paths(&folder).map_err(|_| ApiError::NotFound(folder.clone()))?;
    if !paths.descriptor_json().exists() {
        return Err(ApiError::NotFound(folder));
    }
    state.ensure_approach_active(paths.root());
    let store = Store::open(paths.root());
    let (graph, report) = store.load().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(response::ok(serde_json::json!({ "graph": graph, "validation": report })))
}
