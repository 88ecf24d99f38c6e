//! Persisted story job records and version snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// External story generation status, as polled by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    /// Record created, run not started yet
    Pending,
    /// Generation run in flight
    GeneratingText,
    /// Narration synthesis (never persisted mid-run; kept for API completeness)
    GeneratingAudio,
    /// Background music (never persisted mid-run; kept for API completeness)
    AddingMusic,
    /// Final artifact ready
    Completed,
    /// Run ended with a recorded error
    Failed,
}

impl StoryStatus {
    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Pending => "pending",
            StoryStatus::GeneratingText => "generating_text",
            StoryStatus::GeneratingAudio => "generating_audio",
            StoryStatus::AddingMusic => "adding_music",
            StoryStatus::Completed => "completed",
            StoryStatus::Failed => "failed",
        }
    }

    /// Fixed progress message shown to polling clients
    pub fn progress_message(&self) -> &'static str {
        match self {
            StoryStatus::Pending => "Your story is in the queue...",
            StoryStatus::GeneratingText => "Creating your magical story...",
            StoryStatus::GeneratingAudio => "Bringing the story to life with narration...",
            StoryStatus::AddingMusic => "Adding enchanting background music...",
            StoryStatus::Completed => "Your story is ready!",
            StoryStatus::Failed => "Oh no! Something went wrong.",
        }
    }

    /// True once no further run activity will touch the record
    pub fn is_terminal(&self) -> bool {
        matches!(self, StoryStatus::Completed | StoryStatus::Failed)
    }
}

impl FromStr for StoryStatus {
    type Err = storytone_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StoryStatus::Pending),
            "generating_text" => Ok(StoryStatus::GeneratingText),
            "generating_audio" => Ok(StoryStatus::GeneratingAudio),
            "adding_music" => Ok(StoryStatus::AddingMusic),
            "completed" => Ok(StoryStatus::Completed),
            "failed" => Ok(StoryStatus::Failed),
            other => Err(storytone_common::Error::Internal(format!(
                "Unknown story status: {}",
                other
            ))),
        }
    }
}

/// Input parameters of one logical story
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryBrief {
    pub theme: String,
    pub character_name: Option<String>,
    pub age_group: String,
}

/// One persisted story job (`stories` row)
///
/// Created once per logical story, updated in place across regenerations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: Uuid,
    pub theme: String,
    pub character_name: Option<String>,
    pub age_group: String,
    pub status: StoryStatus,

    // Produced content
    pub story_text: Option<String>,
    pub story_title: Option<String>,
    pub word_count: Option<i64>,

    // Artifacts
    pub narration_path: Option<String>,
    pub music_path: Option<String>,
    pub final_audio_path: Option<String>,
    pub audio_url: Option<String>,

    // Derived
    pub mood: Option<String>,
    pub duration_seconds: Option<f64>,

    pub error_message: Option<String>,

    /// Incremented by the version archiver on each regeneration of a story
    /// that already produced text
    pub current_version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StoryRecord {
    pub fn brief(&self) -> StoryBrief {
        StoryBrief {
            theme: self.theme.clone(),
            character_name: self.character_name.clone(),
            age_group: self.age_group.clone(),
        }
    }

    /// Whether there is produced content worth archiving before a rerun
    pub fn has_produced_text(&self) -> bool {
        self.story_text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Immutable snapshot of a story's produced fields, taken just before a
/// regeneration overwrites them (`story_versions` row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryVersion {
    pub story_id: Uuid,
    pub version_number: i64,
    pub story_text: Option<String>,
    pub story_title: Option<String>,
    pub word_count: Option<i64>,
    pub mood: Option<String>,
    pub final_audio_path: Option<String>,
    pub audio_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}
