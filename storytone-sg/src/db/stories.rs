//! Story record database operations
//!
//! The record has three write points: creation (`Pending`), the run driver's
//! status flip (`GeneratingText`), and the final projection. Pollers only
//! ever observe one of those consistent snapshots.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{PipelineState, PipelineStep, StoryBrief, StoryRecord, StoryStatus};
use storytone_common::{Error, Result};

/// Create a fresh `Pending` story record for a submitted brief
pub async fn create_story(pool: &SqlitePool, brief: &StoryBrief) -> Result<StoryRecord> {
    let record = StoryRecord {
        id: Uuid::new_v4(),
        theme: brief.theme.clone(),
        character_name: brief.character_name.clone(),
        age_group: brief.age_group.clone(),
        status: StoryStatus::Pending,
        story_text: None,
        story_title: None,
        word_count: None,
        narration_path: None,
        music_path: None,
        final_audio_path: None,
        audio_url: None,
        mood: None,
        duration_seconds: None,
        error_message: None,
        current_version: 1,
        created_at: Utc::now(),
        updated_at: None,
        completed_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO stories (
            id, theme, character_name, age_group, status,
            current_version, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.theme)
    .bind(&record.character_name)
    .bind(&record.age_group)
    .bind(record.status.as_str())
    .bind(record.current_version)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(record)
}

/// Load a story record by id
pub async fn load_story(pool: &SqlitePool, story_id: Uuid) -> Result<Option<StoryRecord>> {
    let row = sqlx::query("SELECT * FROM stories WHERE id = ?")
        .bind(story_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| record_from_row(&r)).transpose()
}

/// List story records newest first, with the total count for pagination
pub async fn list_stories(
    pool: &SqlitePool,
    skip: i64,
    limit: i64,
) -> Result<(Vec<StoryRecord>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stories")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        "SELECT * FROM stories ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    let records = rows
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok((records, total))
}

/// Delete a story record; returns false when no row matched
pub async fn delete_story(pool: &SqlitePool, story_id: Uuid) -> Result<bool> {
    let id = story_id.to_string();

    sqlx::query("DELETE FROM story_versions WHERE story_id = ?")
        .bind(&id)
        .execute(pool)
        .await?;

    let result = sqlx::query("DELETE FROM stories WHERE id = ?")
        .bind(&id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Flip the external status (run driver write point)
pub async fn set_status(pool: &SqlitePool, story_id: Uuid, status: StoryStatus) -> Result<()> {
    sqlx::query("UPDATE stories SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(story_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Terminal failure write for errors escaping the pipeline stages
pub async fn mark_failed(pool: &SqlitePool, story_id: Uuid, message: &str) -> Result<()> {
    sqlx::query(
        "UPDATE stories SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
    )
    .bind(StoryStatus::Failed.as_str())
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .bind(story_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Project a terminal pipeline state onto the story record
///
/// A recorded error becomes `Failed` with the message preserved verbatim; a
/// clean run that reached `Completed` copies every produced field and
/// derives the public audio URL from the final artifact's file name.
pub async fn project_final_state(
    pool: &SqlitePool,
    story_id: Uuid,
    state: &PipelineState,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    if let Some(message) = &state.error {
        return mark_failed(pool, story_id, message).await;
    }

    if state.current_step != PipelineStep::Completed {
        // The mix stage either completes or records an error; anything else
        // is a pipeline defect and must still land the record in a terminal
        // state.
        return mark_failed(
            pool,
            story_id,
            &format!("Pipeline ended in unexpected step {:?}", state.current_step),
        )
        .await;
    }

    let final_audio_path = state
        .final_audio_path
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());
    let audio_url = state
        .final_audio_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|name| format!("/api/v1/stories/audio/{}", name.to_string_lossy()));

    sqlx::query(
        r#"
        UPDATE stories SET
            status = ?,
            story_text = ?,
            story_title = ?,
            word_count = ?,
            narration_path = ?,
            music_path = ?,
            final_audio_path = ?,
            audio_url = ?,
            mood = ?,
            duration_seconds = ?,
            error_message = NULL,
            updated_at = ?,
            completed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(StoryStatus::Completed.as_str())
    .bind(&state.story_text)
    .bind(&state.story_title)
    .bind(state.word_count.map(|c| c as i64))
    .bind(
        state
            .narration_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
    )
    .bind(
        state
            .music_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
    )
    .bind(final_audio_path)
    .bind(audio_url)
    .bind(state.mood.map(|m| m.as_str()))
    .bind(state.duration_seconds)
    .bind(&now)
    .bind(&now)
    .bind(story_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Map a `stories` row onto the model
fn record_from_row(row: &SqliteRow) -> Result<StoryRecord> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid story id {}: {}", id, e)))?;

    let status: String = row.get("status");
    let status = StoryStatus::from_str(&status)?;

    Ok(StoryRecord {
        id,
        theme: row.get("theme"),
        character_name: row.get("character_name"),
        age_group: row.get("age_group"),
        status,
        story_text: row.get("story_text"),
        story_title: row.get("story_title"),
        word_count: row.get("word_count"),
        narration_path: row.get("narration_path"),
        music_path: row.get("music_path"),
        final_audio_path: row.get("final_audio_path"),
        audio_url: row.get("audio_url"),
        mood: row.get("mood"),
        duration_seconds: row.get("duration_seconds"),
        error_message: row.get("error_message"),
        current_version: row.get("current_version"),
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_optional_timestamp(row, "updated_at")?,
        completed_at: parse_optional_timestamp(row, "completed_at")?,
    })
}

pub(crate) fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn parse_optional_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(column);
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
        })
        .transpose()
}
