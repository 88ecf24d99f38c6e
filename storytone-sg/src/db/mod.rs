//! Database access for storytone-sg
//!
//! SQLite via sqlx. Two tables: `stories` (one row per logical story,
//! updated in place across regenerations) and `story_versions` (immutable
//! snapshots, accumulating one row per completed-then-regenerated run).

pub mod stories;
pub mod versions;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the storytone tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stories (
            id TEXT PRIMARY KEY,
            theme TEXT NOT NULL,
            character_name TEXT,
            age_group TEXT NOT NULL DEFAULT '5-7',
            status TEXT NOT NULL DEFAULT 'pending',
            story_text TEXT,
            story_title TEXT,
            word_count INTEGER,
            narration_path TEXT,
            music_path TEXT,
            final_audio_path TEXT,
            audio_url TEXT,
            mood TEXT,
            duration_seconds REAL,
            error_message TEXT,
            current_version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS story_versions (
            story_id TEXT NOT NULL,
            version_number INTEGER NOT NULL,
            story_text TEXT,
            story_title TEXT,
            word_count INTEGER,
            mood TEXT,
            final_audio_path TEXT,
            audio_url TEXT,
            duration_seconds REAL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (story_id, version_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (stories, story_versions)");

    Ok(())
}
