//! Orchestrator server binary.
//!
//! Standalone HTTP/WebSocket server exposing approach management, the chat
//! loop, and Auto Mode control over the workspace configured by
//! `ORCHESTRATOR_CONFIG` (or `--config`) and `HG_*` environment variables.

use orchestrator::config::{OrchestratorConfig, ProviderCredentials};
use orchestrator::{create_router, AppState, Workspace};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config_path = std::env::var("ORCHESTRATOR_CONFIG").ok().map(std::path::PathBuf::from);
    let config = OrchestratorConfig::load(config_path.as_deref(), "HG_")
        .map_err(|e| format!("invalid configuration: {e}"))?;
    tracing::info!(
        workspace_root = %config.workspace_root.display(),
        chat_model = %config.chat_model_id,
        auto_model = %config.auto_model_id,
        "configuration loaded"
    );

    let credentials = ProviderCredentials::from_env();
    let chat_model = build_chat_model(&config.chat_model_id, credentials.chat_api_key.as_deref());
    let auto_model = build_chat_model(&config.auto_model_id, credentials.auto_api_key.as_deref());
    let evaluator_model = build_chat_model(&config.evaluator_model_id, credentials.chat_api_key.as_deref());

    let workspace = Arc::new(Workspace::new(config.workspace_root.clone()));
    let state = AppState::new(workspace, Arc::new(config), chat_model, auto_model, evaluator_model);

    let app = create_router(state);

    let port: u16 = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse()?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!(%addr, "starting orchestrator server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("orchestrator server shut down gracefully");
    Ok(())
}

/// Resolve the chat model backing one of the three provider roles (`§6`).
/// Missing credentials degrade the role rather than failing startup: it
/// falls back to a fixed-reply mock that explains the missing key, so the
/// server still starts and other approaches/endpoints keep working.
fn build_chat_model(model_id: &str, api_key: Option<&str>) -> Arc<dyn hg_llm::ChatModel> {
    match api_key {
        Some(key) if model_id.starts_with("claude") => {
            let config = hg_llm::RemoteLlmConfig::new(key, "https://api.anthropic.com", model_id);
            Arc::new(hg_llm::remote::ClaudeClient::new(config))
        }
        Some(key) => {
            let config = hg_llm::RemoteLlmConfig::new(key, "https://api.openai.com/v1", model_id);
            Arc::new(hg_llm::remote::OpenAiClient::new(config))
        }
        None => {
            tracing::warn!(model_id, "no API key configured for this provider role; using a stub model");
            Arc::new(hg_llm::mock::MockChatModel::fixed_text(
                model_id,
                "This provider role has no API key configured; set the matching HG_*_API_KEY environment variable.",
            ))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
