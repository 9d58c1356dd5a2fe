//! REST API Server for the financial chat assistant
//!
//! Exposes chat, clear and health endpoints and optionally serves the
//! static frontend.

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::agent::Orchestrator;
use crate::error::ChatError;

pub const DEFAULT_CONVERSATION_ID: &str = "default";
const API_KEY_INSTRUCTIONS: &str = "Get your free key at: https://aistudio.google.com/app/apikey";

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            instructions: None,
            details: None,
        }
    }

    fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub api_key_configured: bool,
    pub data_sources: Vec<&'static str>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, api_key_configured: bool) -> Self {
        let data_sources = orchestrator.data_sources();
        Self {
            orchestrator,
            api_key_configured,
            data_sources,
        }
    }
}

/// =============================
/// Helpers
/// =============================

fn conversation_id_or_default(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONVERSATION_ID.to_string())
}

/// Map an orchestrator error onto a status code and a user-facing body
pub fn error_response(err: &ChatError) -> (StatusCode, Json<ErrorBody>) {
    let (status, body) = match err {
        ChatError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg.clone())),
        ChatError::Configuration(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorBody::new("API key not configured. Please add GEMINI_API_KEY to your .env file")
                .instructions(API_KEY_INSTRUCTIONS),
        ),
        ChatError::UpstreamAuth(_) => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::new("Invalid API key. Please check your GEMINI_API_KEY in .env file")
                .instructions(API_KEY_INSTRUCTIONS),
        ),
        ChatError::UpstreamRateLimited(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            ErrorBody::new("Rate limit reached. Please wait a moment and try again.")
                .details("Free tier has usage limits."),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Failed to process message. Please try again.").details(other.to_string()),
        ),
    };

    (status, Json(body))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "apiKeyConfigured": state.api_key_configured,
        "model": state.orchestrator.model_name(),
        "tools": state.orchestrator.registry().list(),
        "dataSources": state.data_sources,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    body: Option<Json<ChatRequest>>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| error_response(&ChatError::Validation("Message is required".to_string())))?;

    if !state.api_key_configured {
        warn!("Chat request rejected: GEMINI_API_KEY is not configured");
        return Err(error_response(&ChatError::Configuration(
            "GEMINI_API_KEY not configured".to_string(),
        )));
    }

    let conversation_id = conversation_id_or_default(req.conversation_id);
    info!(conversation_id = %conversation_id, "Received chat message");

    match state.orchestrator.chat(&conversation_id, &message).await {
        Ok(answer) => Ok(Json(ChatResponse {
            response: answer.response,
            conversation_id,
        })),
        Err(e) => {
            error!(conversation_id = %conversation_id, "Chat failed: {}", e);
            Err(error_response(&e))
        }
    }
}

/// =============================
/// Clear Endpoint
/// =============================

async fn clear_handler(
    State(state): State<ApiState>,
    body: Option<Json<ClearRequest>>,
) -> Json<serde_json::Value> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let conversation_id = conversation_id_or_default(req.conversation_id);

    if let Err(e) = state.orchestrator.clear(&conversation_id).await {
        warn!(conversation_id = %conversation_id, "Clearing conversation failed: {}", e);
    }

    Json(serde_json::json!({ "message": "Conversation cleared" }))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState, frontend_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/clear", post(clear_handler))
        .with_state(state);

    let router = match frontend_dir {
        Some(dir) if dir.is_dir() => {
            info!("Serving frontend from {}", dir.display());
            let index = ServeFile::new(dir.join("index.html"));
            router.fallback_service(ServeDir::new(dir).not_found_service(index))
        }
        Some(dir) => {
            warn!("FRONTEND_DIR {} is not a directory, static files disabled", dir.display());
            router
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
    frontend_dir: Option<&Path>,
) -> crate::Result<()> {
    let router = create_router(state, frontend_dir);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSourceConfig;
    use crate::fetchers::DataFetcher;
    use crate::llm::mock::ScriptedModel;
    use crate::memory::InMemoryConversationStore;
    use crate::models::ModelResponse;
    use crate::tools::ToolDispatcher;
    use axum::body::Body;
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state(responses: Vec<crate::Result<ModelResponse>>, api_key_configured: bool) -> ApiState {
        let dispatcher = ToolDispatcher::new(DataFetcher::new(DataSourceConfig::default()).unwrap());
        let orchestrator = Orchestrator::new(
            Arc::new(ScriptedModel::new(responses)),
            dispatcher,
            Arc::new(InMemoryConversationStore::new()),
        );
        ApiState::new(Arc::new(orchestrator), api_key_configured)
    }

    async fn post(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_chat_success_and_history() {
        let state = state(vec![Ok(ModelResponse::Text("PPF locks in for 15 years.".into()))], true);
        let orchestrator = state.orchestrator.clone();
        let router = create_router(state, None);

        let (status, body) = post(router, "/api/chat", json!({ "message": "What is PPF?" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "response": "PPF locks in for 15 years.", "conversationId": "default" })
        );
        assert_eq!(orchestrator.store().get("default").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_message_is_bad_request() {
        let router = create_router(state(vec![], true), None);

        let (status, body) = post(router, "/api/chat", json!({ "conversationId": "x" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
    }

    #[tokio::test]
    async fn test_missing_key_is_service_unavailable() {
        let router = create_router(state(vec![], false), None);

        let (status, body) = post(router, "/api/chat", json!({ "message": "hi" })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["instructions"].as_str().unwrap().contains("aistudio.google.com"));
    }

    #[tokio::test]
    async fn test_upstream_errors_are_mapped() {
        let cases = vec![
            (ChatError::UpstreamAuth("bad key".into()), StatusCode::UNAUTHORIZED),
            (ChatError::UpstreamRateLimited("429".into()), StatusCode::TOO_MANY_REQUESTS),
            (ChatError::Llm("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let router = create_router(state(vec![Err(err)], true), None);
            let (status, body) = post(router, "/api/chat", json!({ "message": "hi" })).await;
            assert_eq!(status, expected);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_server_error_carries_details() {
        let router = create_router(state(vec![Err(ChatError::Llm("boom".into()))], true), None);
        let (_, body) = post(router, "/api/chat", json!({ "message": "hi" })).await;
        assert_eq!(body["details"], "LLM error: boom");
    }

    #[tokio::test]
    async fn test_clear_always_acknowledges() {
        let state = state(vec![Ok(ModelResponse::Text("Answer".into()))], true);
        let orchestrator = state.orchestrator.clone();
        let router = create_router(state, None);

        let (_, _) = post(router.clone(), "/api/chat", json!({ "message": "Q", "conversationId": "abc" })).await;
        let (status, body) = post(router.clone(), "/api/clear", json!({ "conversationId": "abc" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Conversation cleared" }));
        assert!(orchestrator.store().get("abc").await.unwrap().is_empty());

        let (status, body) = post(router, "/api/clear", json!({ "conversationId": "never-used" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Conversation cleared");
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let router = create_router(state(vec![], false), None);
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["apiKeyConfigured"], false);
        assert_eq!(body["tools"].as_array().unwrap().len(), 5);
    }
}
