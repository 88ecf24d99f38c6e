//! storytone-sg - Story Generation Service
//!
//! Turns a short content brief into a finished narrated audio artifact:
//! generated story text, synthesized narration, mood-matched background
//! music, and a mixed master, tracked in a persisted job record that
//! clients poll over HTTP.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storytone_sg::config::ServiceConfig;
use storytone_sg::services::StoryPipeline;
use storytone_sg::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting storytone-sg (Story Generation) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration (ENV -> TOML -> defaults)
    let config = ServiceConfig::load()?;
    info!("Data folder: {}", config.data_folder.display());

    // Artifact directory must exist before the first run writes into it
    std::fs::create_dir_all(config.stories_dir())?;

    // Initialize database connection pool
    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = storytone_sg::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Build the generation pipeline from configured providers
    let pipeline = Arc::new(StoryPipeline::from_config(&config)?);
    info!("Generation pipeline ready");

    // Create application state and router
    let state = AppState::new(db_pool, pipeline, config.stories_dir());
    let app = storytone_sg::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.bind_host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
