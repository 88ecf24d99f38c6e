//! Version archiver
//!
//! Before a regeneration overwrites a story's produced fields, the archiver
//! copies them into an immutable `story_versions` snapshot tagged with the
//! record's current version number, then increments the counter and resets
//! the record for a fresh run. A story that never produced text has nothing
//! worth preserving and is only reset.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::models::{StoryRecord, StoryStatus, StoryVersion};
use storytone_common::{Error, Result};

/// Archive the record's produced fields (when any exist) and reset it for a
/// fresh run. Returns the archived version number, or `None` when archiving
/// was skipped.
pub async fn archive_and_reset(pool: &SqlitePool, record: &StoryRecord) -> Result<Option<i64>> {
    let mut tx = pool.begin().await?;
    let now = Utc::now().to_rfc3339();

    let archived = if record.has_produced_text() {
        sqlx::query(
            r#"
            INSERT INTO story_versions (
                story_id, version_number, story_text, story_title, word_count,
                mood, final_audio_path, audio_url, duration_seconds, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.current_version)
        .bind(&record.story_text)
        .bind(&record.story_title)
        .bind(record.word_count)
        .bind(&record.mood)
        .bind(&record.final_audio_path)
        .bind(&record.audio_url)
        .bind(record.duration_seconds)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        Some(record.current_version)
    } else {
        None
    };

    let next_version = match archived {
        Some(version) => version + 1,
        None => record.current_version,
    };

    sqlx::query(
        r#"
        UPDATE stories SET
            status = ?,
            error_message = NULL,
            current_version = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(StoryStatus::Pending.as_str())
    .bind(next_version)
    .bind(&now)
    .bind(record.id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    match archived {
        Some(version) => {
            tracing::info!(
                story_id = %record.id,
                archived_version = version,
                "Story version archived before regeneration"
            );
        }
        None => {
            tracing::info!(
                story_id = %record.id,
                "No produced text to archive; regenerating in place"
            );
        }
    }

    Ok(archived)
}

/// List a story's snapshots, newest first
pub async fn list_versions(pool: &SqlitePool, story_id: Uuid) -> Result<Vec<StoryVersion>> {
    let rows = sqlx::query(
        "SELECT * FROM story_versions WHERE story_id = ? ORDER BY version_number DESC",
    )
    .bind(story_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(version_from_row).collect()
}

/// Exact-match snapshot lookup; a missing version is a not-found error,
/// never a silent default
pub async fn get_version(
    pool: &SqlitePool,
    story_id: Uuid,
    version_number: i64,
) -> Result<StoryVersion> {
    let row = sqlx::query(
        "SELECT * FROM story_versions WHERE story_id = ? AND version_number = ?",
    )
    .bind(story_id.to_string())
    .bind(version_number)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => version_from_row(&row),
        None => Err(Error::NotFound(format!(
            "Version {} of story {} not found",
            version_number, story_id
        ))),
    }
}

fn version_from_row(row: &SqliteRow) -> Result<StoryVersion> {
    let story_id: String = row.get("story_id");
    let story_id = Uuid::parse_str(&story_id)
        .map_err(|e| Error::Internal(format!("Invalid story id {}: {}", story_id, e)))?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?;

    Ok(StoryVersion {
        story_id,
        version_number: row.get("version_number"),
        story_text: row.get("story_text"),
        story_title: row.get("story_title"),
        word_count: row.get("word_count"),
        mood: row.get("mood"),
        final_audio_path: row.get("final_audio_path"),
        audio_url: row.get("audio_url"),
        duration_seconds: row.get("duration_seconds"),
        created_at,
    })
}
