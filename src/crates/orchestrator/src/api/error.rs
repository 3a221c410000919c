//! API error types and their HTTP response conversion (`§6`).

use crate::error::OrchestratorError;
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Orchestrator(e) => match e {
                OrchestratorError::UnknownApproach(_) => StatusCode::NOT_FOUND,
                OrchestratorError::TurnInProgress(_) => StatusCode::CONFLICT,
                OrchestratorError::InvalidToolCall(_) | OrchestratorError::Config(_) => StatusCode::BAD_REQUEST,
                OrchestratorError::Cancelled => StatusCode::GONE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Orchestrator(e) => match e {
                OrchestratorError::UnknownApproach(_) => "UNKNOWN_APPROACH",
                OrchestratorError::TurnInProgress(_) => "TURN_IN_PROGRESS",
                OrchestratorError::Cancelled => "CANCELLED",
                OrchestratorError::ToolBudgetExhausted(_) => "TOOL_BUDGET_EXHAUSTED",
                OrchestratorError::Graph(_) => "GRAPH_ERROR",
                OrchestratorError::Judge(_) => "JUDGE_ERROR",
                OrchestratorError::Provider(_) => "PROVIDER_ERROR",
                _ => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(format!("{self:?}"), self.to_string(), self.code());
        tracing::error!(error = %self, "api error");
        (status, Json(body)).into_response()
    }
}
