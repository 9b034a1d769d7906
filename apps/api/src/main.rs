use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interviewace::config::Config;
use interviewace::llm_client::{self, GeminiClient};
use interviewace::resumes::{JsonFileRepository, ResumeLibrary};
use interviewace::routes::build_router;
use interviewace::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting InterviewAce API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the hosted model client
    let model = GeminiClient::new(config.gemini_api_key.clone())?;
    info!(
        "LLM client initialized (text model: {}, speech model: {})",
        llm_client::TEXT_MODEL,
        llm_client::TTS_MODEL
    );

    // Load the resume library from disk
    let repo = JsonFileRepository::new(config.data_dir.clone());
    let resumes = ResumeLibrary::load(Box::new(repo))?;
    info!("Resume library at {}", config.data_dir.display());

    let state = AppState::new(Arc::new(model), config.limits(), resumes);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
