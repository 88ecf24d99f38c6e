//! Story API handlers
//!
//! POST /api/v1/stories, GET /api/v1/stories, GET /api/v1/stories/{id},
//! GET /api/v1/stories/{id}/status, DELETE /api/v1/stories/{id},
//! POST /api/v1/stories/{id}/regenerate, GET /api/v1/stories/{id}/versions,
//! GET /api/v1/stories/{id}/versions/{n}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db,
    error::{ApiError, ApiResult},
    models::{StoryBrief, StoryRecord, StoryStatus, StoryVersion},
    services::story_pipeline::run_generation,
    AppState,
};

const MAX_THEME_CHARS: usize = 500;
const MAX_CHARACTER_NAME_CHARS: usize = 100;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// POST /stories request
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    pub theme: String,
    pub character_name: Option<String>,
    #[serde(default = "default_age_group")]
    pub age_group: String,
}

fn default_age_group() -> String {
    "5-7".to_string()
}

/// Story payload returned to clients (server-local artifact paths stay
/// server-side; clients get the audio URL)
#[derive(Debug, Serialize)]
pub struct StoryResponse {
    pub id: Uuid,
    pub theme: String,
    pub character_name: Option<String>,
    pub age_group: String,
    pub status: StoryStatus,
    pub story_title: Option<String>,
    pub story_text: Option<String>,
    pub word_count: Option<i64>,
    pub mood: Option<String>,
    pub duration_seconds: Option<f64>,
    pub audio_url: Option<String>,
    pub error_message: Option<String>,
    pub current_version: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<StoryRecord> for StoryResponse {
    fn from(record: StoryRecord) -> Self {
        Self {
            id: record.id,
            theme: record.theme,
            character_name: record.character_name,
            age_group: record.age_group,
            status: record.status,
            story_title: record.story_title,
            story_text: record.story_text,
            word_count: record.word_count,
            mood: record.mood,
            duration_seconds: record.duration_seconds,
            audio_url: record.audio_url,
            error_message: record.error_message,
            current_version: record.current_version,
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

/// GET /stories/{id}/status response
#[derive(Debug, Serialize)]
pub struct StoryStatusResponse {
    pub id: Uuid,
    pub status: StoryStatus,
    pub progress_message: &'static str,
    pub audio_url: Option<String>,
    pub error_message: Option<String>,
}

/// GET /stories response
#[derive(Debug, Serialize)]
pub struct StoryListResponse {
    pub stories: Vec<StoryResponse>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

/// POST /stories/{id}/regenerate response
#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub id: Uuid,
    pub status: StoryStatus,
    pub current_version: i64,
    /// Version number the previous content was archived under, if any
    pub archived_version: Option<i64>,
}

/// Version snapshot payload
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub story_id: Uuid,
    pub version_number: i64,
    pub story_title: Option<String>,
    pub story_text: Option<String>,
    pub word_count: Option<i64>,
    pub mood: Option<String>,
    pub audio_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<StoryVersion> for VersionResponse {
    fn from(version: StoryVersion) -> Self {
        Self {
            story_id: version.story_id,
            version_number: version.version_number,
            story_title: version.story_title,
            story_text: version.story_text,
            word_count: version.word_count,
            mood: version.mood,
            audio_url: version.audio_url,
            duration_seconds: version.duration_seconds,
            created_at: version.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionListResponse {
    pub story_id: Uuid,
    pub versions: Vec<VersionResponse>,
}

pub fn story_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/stories", post(create_story).get(list_stories))
        .route("/api/v1/stories/:id", get(get_story).delete(delete_story))
        .route("/api/v1/stories/:id/status", get(get_story_status))
        .route("/api/v1/stories/:id/regenerate", post(regenerate_story))
        .route("/api/v1/stories/:id/versions", get(list_story_versions))
        .route("/api/v1/stories/:id/versions/:version", get(get_story_version))
}

/// POST /stories
///
/// Create a story record and start a background generation run. Returns
/// 202 Accepted; clients poll GET /stories/{id}/status for progress.
pub async fn create_story(
    State(state): State<AppState>,
    Json(request): Json<CreateStoryRequest>,
) -> ApiResult<(StatusCode, Json<StoryResponse>)> {
    validate_brief(&request)?;

    let brief = StoryBrief {
        theme: request.theme.trim().to_string(),
        character_name: request
            .character_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        age_group: request.age_group,
    };

    let record = db::stories::create_story(&state.db, &brief).await?;

    tracing::info!(
        story_id = %record.id,
        theme = %record.theme,
        "Story created, starting generation"
    );

    tokio::spawn(run_generation(
        state.db.clone(),
        state.pipeline.clone(),
        record.id,
    ));

    Ok((StatusCode::ACCEPTED, Json(record.into())))
}

/// GET /stories
pub async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<StoryListResponse>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let skip = params.skip.max(0);

    let (records, total) = db::stories::list_stories(&state.db, skip, limit).await?;

    Ok(Json(StoryListResponse {
        stories: records.into_iter().map(StoryResponse::from).collect(),
        total,
        page: skip / limit + 1,
        page_size: limit,
    }))
}

/// GET /stories/{id}
pub async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<StoryResponse>> {
    let record = load_or_404(&state, story_id).await?;
    Ok(Json(record.into()))
}

/// GET /stories/{id}/status
pub async fn get_story_status(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<StoryStatusResponse>> {
    let record = load_or_404(&state, story_id).await?;

    Ok(Json(StoryStatusResponse {
        id: record.id,
        status: record.status,
        progress_message: record.status.progress_message(),
        audio_url: record.audio_url,
        error_message: record.error_message,
    }))
}

/// DELETE /stories/{id}
///
/// Removes the record, its snapshots, and (best-effort) its artifacts.
pub async fn delete_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let record = load_or_404(&state, story_id).await?;

    for path in [
        record.narration_path.as_deref(),
        record.music_path.as_deref(),
        record.final_audio_path.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(story_id = %story_id, path, error = %e, "Artifact cleanup failed");
            }
        }
    }

    db::stories::delete_story(&state.db, story_id).await?;

    tracing::info!(story_id = %story_id, "Story deleted");

    Ok(Json(serde_json::json!({ "message": "Story deleted successfully" })))
}

/// POST /stories/{id}/regenerate
///
/// Archive the current content (when any), reset the record, and start a
/// fresh run with the same input parameters. Returns 202 Accepted.
pub async fn regenerate_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<RegenerateResponse>)> {
    let record = load_or_404(&state, story_id).await?;

    let archived_version = db::versions::archive_and_reset(&state.db, &record).await?;
    let current_version = match archived_version {
        Some(version) => version + 1,
        None => record.current_version,
    };

    tracing::info!(
        story_id = %story_id,
        current_version,
        archived_version = ?archived_version,
        "Regenerating story"
    );

    tokio::spawn(run_generation(
        state.db.clone(),
        state.pipeline.clone(),
        story_id,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(RegenerateResponse {
            id: story_id,
            status: StoryStatus::Pending,
            current_version,
            archived_version,
        }),
    ))
}

/// GET /stories/{id}/versions
pub async fn list_story_versions(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<VersionListResponse>> {
    // 404 for unknown stories, an empty list for known ones
    load_or_404(&state, story_id).await?;

    let versions = db::versions::list_versions(&state.db, story_id).await?;

    Ok(Json(VersionListResponse {
        story_id,
        versions: versions.into_iter().map(VersionResponse::from).collect(),
    }))
}

/// GET /stories/{id}/versions/{n}
pub async fn get_story_version(
    State(state): State<AppState>,
    Path((story_id, version_number)): Path<(Uuid, i64)>,
) -> ApiResult<Json<VersionResponse>> {
    let version = db::versions::get_version(&state.db, story_id, version_number).await?;
    Ok(Json(version.into()))
}

async fn load_or_404(state: &AppState, story_id: Uuid) -> Result<StoryRecord, ApiError> {
    db::stories::load_story(&state.db, story_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Story not found: {}", story_id)))
}

fn validate_brief(request: &CreateStoryRequest) -> Result<(), ApiError> {
    let theme = request.theme.trim();
    if theme.is_empty() {
        return Err(ApiError::BadRequest("Theme must not be empty".to_string()));
    }
    if theme.chars().count() > MAX_THEME_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Theme must be at most {} characters",
            MAX_THEME_CHARS
        )));
    }
    if let Some(name) = &request.character_name {
        if name.chars().count() > MAX_CHARACTER_NAME_CHARS {
            return Err(ApiError::BadRequest(format!(
                "Character name must be at most {} characters",
                MAX_CHARACTER_NAME_CHARS
            )));
        }
    }
    // Unrecognized age groups are allowed; the text stage resolves them to
    // the default writing profile
    Ok(())
}
