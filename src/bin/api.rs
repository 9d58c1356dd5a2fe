use financial_chat_assistant::{
    agent::Orchestrator,
    api::{start_server, ApiState},
    config::AppConfig,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();

    info!("🚀 Financial Chat Assistant - API Server");
    info!("📍 Port: {}", config.port);
    info!("🤖 Model: {}", config.llm.model);

    if config.llm.api_key_configured() {
        info!("🔑 GEMINI_API_KEY configured");
    } else {
        warn!("⚠️  GEMINI_API_KEY not set in .env, chat requests will be rejected");
        warn!("📌 Get your free key at: https://aistudio.google.com/app/apikey");
    }

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    info!("✅ Orchestrator initialized with tools: {:?}", orchestrator.registry().list());

    let state = ApiState::new(orchestrator, config.llm.api_key_configured());

    info!("📡 Starting API server...");
    start_server(state, config.port, config.frontend_dir.as_deref()).await?;

    info!("👋 Server stopped");
    Ok(())
}
