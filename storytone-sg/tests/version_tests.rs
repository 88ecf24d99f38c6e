//! Version archiver tests against a real SQLite pool

mod helpers;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use storytone_sg::db;
use storytone_sg::models::{PipelineState, PipelineStep, StoryBrief, StoryRecord, StoryStatus};

async fn test_pool() -> SqlitePool {
    // Single connection keeps the in-memory database alive across queries
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_tables(&pool).await.unwrap();
    pool
}

fn squirrel_brief() -> StoryBrief {
    StoryBrief {
        theme: "a brave squirrel who learns to share".to_string(),
        character_name: None,
        age_group: "5-7".to_string(),
    }
}

/// Project a scripted completed run onto the record
async fn complete_story(pool: &SqlitePool, story_id: Uuid, title: &str) {
    let mut state = PipelineState::new(story_id, &squirrel_brief());
    state.story_text = Some(helpers::story_text());
    state.story_title = Some(title.to_string());
    state.word_count = Some(460);
    state.narration_path = Some("/tmp/narr.wav".into());
    state.music_path = Some("/tmp/music.wav".into());
    state.final_audio_path = Some(format!("/tmp/{}_20260101_000000_final.wav", story_id).into());
    state.duration_seconds = Some(182.5);
    state.mood = Some(storytone_sg::services::Mood::Adventure);
    state.current_step = PipelineStep::Completed;

    db::stories::project_final_state(pool, story_id, &state)
        .await
        .unwrap();
}

async fn load(pool: &SqlitePool, story_id: Uuid) -> StoryRecord {
    db::stories::load_story(pool, story_id).await.unwrap().unwrap()
}

#[tokio::test]
async fn regenerating_before_any_text_archives_nothing() {
    let pool = test_pool().await;
    let record = db::stories::create_story(&pool, &squirrel_brief()).await.unwrap();

    let archived = db::versions::archive_and_reset(&pool, &record).await.unwrap();
    assert_eq!(archived, None);

    let reloaded = load(&pool, record.id).await;
    assert_eq!(reloaded.current_version, 1);
    assert_eq!(reloaded.status, StoryStatus::Pending);

    let versions = db::versions::list_versions(&pool, record.id).await.unwrap();
    assert!(versions.is_empty());
}

#[tokio::test]
async fn regenerating_completed_story_archives_exactly_one_snapshot() {
    let pool = test_pool().await;
    let record = db::stories::create_story(&pool, &squirrel_brief()).await.unwrap();
    complete_story(&pool, record.id, "The Sharing Squirrel").await;

    let completed = load(&pool, record.id).await;
    assert_eq!(completed.status, StoryStatus::Completed);
    assert_eq!(completed.current_version, 1);
    assert!(completed.audio_url.is_some());

    // Snapshot is tagged with the pre-increment version
    let archived = db::versions::archive_and_reset(&pool, &completed).await.unwrap();
    assert_eq!(archived, Some(1));

    let reloaded = load(&pool, record.id).await;
    assert_eq!(reloaded.current_version, 2);
    assert_eq!(reloaded.status, StoryStatus::Pending);
    assert!(reloaded.error_message.is_none());

    let versions = db::versions::list_versions(&pool, record.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version_number, 1);
    assert_eq!(versions[0].story_title.as_deref(), Some("The Sharing Squirrel"));
    assert_eq!(versions[0].word_count, Some(460));
    assert_eq!(versions[0].mood.as_deref(), Some("adventure"));
    assert_eq!(versions[0].duration_seconds, Some(182.5));
}

#[tokio::test]
async fn snapshots_accumulate_across_regenerations() {
    let pool = test_pool().await;
    let record = db::stories::create_story(&pool, &squirrel_brief()).await.unwrap();

    complete_story(&pool, record.id, "First Telling").await;
    db::versions::archive_and_reset(&pool, &load(&pool, record.id).await)
        .await
        .unwrap();

    complete_story(&pool, record.id, "Second Telling").await;
    let archived = db::versions::archive_and_reset(&pool, &load(&pool, record.id).await)
        .await
        .unwrap();
    assert_eq!(archived, Some(2));

    let reloaded = load(&pool, record.id).await;
    assert_eq!(reloaded.current_version, 3);

    // Newest first
    let versions = db::versions::list_versions(&pool, record.id).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version_number, 2);
    assert_eq!(versions[0].story_title.as_deref(), Some("Second Telling"));
    assert_eq!(versions[1].version_number, 1);
    assert_eq!(versions[1].story_title.as_deref(), Some("First Telling"));
}

#[tokio::test]
async fn get_version_is_exact_match_or_not_found() {
    let pool = test_pool().await;
    let record = db::stories::create_story(&pool, &squirrel_brief()).await.unwrap();
    complete_story(&pool, record.id, "The Sharing Squirrel").await;
    db::versions::archive_and_reset(&pool, &load(&pool, record.id).await)
        .await
        .unwrap();

    let version = db::versions::get_version(&pool, record.id, 1).await.unwrap();
    assert_eq!(version.version_number, 1);
    assert_eq!(version.story_id, record.id);

    // No silent default for a version that was never archived
    let missing = db::versions::get_version(&pool, record.id, 2).await;
    assert!(matches!(missing, Err(storytone_common::Error::NotFound(_))));

    let unknown_story = db::versions::get_version(&pool, Uuid::new_v4(), 1).await;
    assert!(matches!(unknown_story, Err(storytone_common::Error::NotFound(_))));
}

#[tokio::test]
async fn failed_projection_preserves_error_verbatim() {
    let pool = test_pool().await;
    let record = db::stories::create_story(&pool, &squirrel_brief()).await.unwrap();

    let mut state = PipelineState::new(record.id, &squirrel_brief());
    state.advance_to(PipelineStep::GeneratingText);
    state.fail("generation failed: model unavailable");

    db::stories::project_final_state(&pool, record.id, &state)
        .await
        .unwrap();

    let reloaded = load(&pool, record.id).await;
    assert_eq!(reloaded.status, StoryStatus::Failed);
    assert_eq!(
        reloaded.error_message.as_deref(),
        Some("generation failed: model unavailable")
    );
    assert!(reloaded.final_audio_path.is_none());
}

#[tokio::test]
async fn completed_projection_derives_the_audio_url() {
    let pool = test_pool().await;
    let record = db::stories::create_story(&pool, &squirrel_brief()).await.unwrap();
    complete_story(&pool, record.id, "The Sharing Squirrel").await;

    let reloaded = load(&pool, record.id).await;
    assert_eq!(
        reloaded.audio_url.as_deref(),
        Some(
            format!(
                "/api/v1/stories/audio/{}_20260101_000000_final.wav",
                record.id
            )
            .as_str()
        )
    );
    assert!(reloaded.completed_at.is_some());
    assert_eq!(reloaded.status, StoryStatus::Completed);
}
