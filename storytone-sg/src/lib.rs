//! storytone-sg library interface
//!
//! Exposes the service internals for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::services::StoryPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Pipeline orchestrator; one instance serves every run
    pub pipeline: Arc<StoryPipeline>,
    /// Where story artifacts live (served under /api/v1/stories/audio)
    pub stories_dir: PathBuf,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: Arc<StoryPipeline>, stories_dir: PathBuf) -> Self {
        Self {
            db,
            pipeline,
            stories_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::story_routes())
        .merge(api::health_routes())
        // Finished artifacts are plain files; ServeDir handles range
        // requests and content types
        .nest_service(
            "/api/v1/stories/audio",
            ServeDir::new(&state.stories_dir),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
