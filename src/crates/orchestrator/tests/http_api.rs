//! End-to-end tests over the HTTP API: create an approach, add a claim and
//! implication through the chat loop's tool dispatch, fetch the resulting
//! graph snapshot, and exercise Auto Mode's start/pause/stop controls.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use hg_llm::mock::{MockChatModel, ScriptedTurn};
use orchestrator::config::OrchestratorConfig;
use orchestrator::{create_router, AppState, Workspace};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_state(root: &std::path::Path, chat_model: Arc<dyn hg_llm::ChatModel>) -> AppState {
    let workspace = Arc::new(Workspace::new(root));
    let config = Arc::new(OrchestratorConfig::default());
    let evaluator: Arc<dyn hg_llm::ChatModel> = Arc::new(MockChatModel::fixed_text(
        "mock-judge",
        "<score>8</score><reasoning>looks solid</reasoning>",
    ));
    AppState::new(workspace, config, chat_model.clone(), chat_model, evaluator)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn creating_an_approach_and_fetching_its_graph_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let model: Arc<dyn hg_llm::ChatModel> = Arc::new(MockChatModel::fixed_text("mock-chat", "hi"));
    let app = create_router(test_state(dir.path(), model));

    let create = app
        .clone()
        .oneshot(
            Request::post("/api/v1/approaches")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "folder": "alpha",
                        "display_name": "Alpha Approach",
                        "original_hypothesis": "X works under load"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::CREATED);

    let graph_resp = app
        .clone()
        .oneshot(Request::get("/api/v1/approaches/alpha/graph").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(graph_resp.status(), StatusCode::OK);
    let body = json_body(graph_resp).await;
    let claims = &body["data"]["graph"]["claims"];
    assert!(claims.get("hypothesis").is_some(), "expected the seeded hypothesis claim: {body}");
}

#[tokio::test]
async fn unknown_approach_graph_fetch_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let model: Arc<dyn hg_llm::ChatModel> = Arc::new(MockChatModel::fixed_text("mock-chat", "hi"));
    let app = create_router(test_state(dir.path(), model));

    let resp = app
        .oneshot(Request::get("/api/v1/approaches/does-not-exist/graph").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn a_tool_calling_turn_adds_a_claim_visible_in_the_next_graph_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let model: Arc<dyn hg_llm::ChatModel> = Arc::new(MockChatModel::new(
        "mock-chat",
        vec![
            ScriptedTurn::ToolCalls(vec![hg_llm::ToolCall {
                id: "call1".into(),
                name: "add_claim".into(),
                arguments: json!({"id": "c1", "text": "A holds under load"}),
            }]),
            ScriptedTurn::Text("Added the claim.".into()),
        ],
    ));
    let app = create_router(test_state(dir.path(), model));

    app.clone()
        .oneshot(
            Request::post("/api/v1/approaches")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"folder": "alpha", "display_name": "Alpha", "original_hypothesis": "X works"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let session_resp = app
        .clone()
        .oneshot(
            Request::post("/api/v1/approaches/alpha/sessions")
                .header("content-type", "application/json")
                .body(Body::from(json!({}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(session_resp.status(), StatusCode::OK);
    let session_body = json_body(session_resp).await;
    let session_id = session_body["data"]["session_id"].as_str().unwrap().to_string();

    let turn_resp = app
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/approaches/alpha/sessions/{session_id}/turns"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"text": "please add a supporting claim"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(turn_resp.status(), StatusCode::OK);

    // The turn runs in a spawned task; give it a moment to finish the
    // (mock, in-process) tool call before checking the graph.
    for _ in 0..20 {
        let graph_resp = app
            .clone()
            .oneshot(Request::get("/api/v1/approaches/alpha/graph").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(graph_resp).await;
        if body["data"]["graph"]["claims"].get("c1").is_some() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("expected claim c1 to appear after the turn completed");
}
