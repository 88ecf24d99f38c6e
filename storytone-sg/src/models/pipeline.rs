//! Generation pipeline state machine
//!
//! One `PipelineState` is created per run, owned exclusively by that run,
//! and discarded after its final projection onto the story record. Steps
//! progress strictly forward:
//!
//! Starting -> GeneratingText -> GeneratingAudio -> AddingMusic -> Finalizing -> Completed

use crate::models::StoryBrief;
use crate::services::mood::Mood;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Internal pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Starting,
    GeneratingText,
    GeneratingAudio,
    AddingMusic,
    Finalizing,
    Completed,
}

impl PipelineStep {
    /// Position in the fixed stage order; used to enforce forward-only
    /// transitions
    pub fn sequence_index(&self) -> u8 {
        match self {
            PipelineStep::Starting => 0,
            PipelineStep::GeneratingText => 1,
            PipelineStep::GeneratingAudio => 2,
            PipelineStep::AddingMusic => 3,
            PipelineStep::Finalizing => 4,
            PipelineStep::Completed => 5,
        }
    }
}

/// Mutable state threaded through one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    // Identity
    pub story_id: Uuid,
    pub theme: String,
    pub character_name: Option<String>,
    pub age_group: String,

    // Produced content
    pub story_text: Option<String>,
    pub story_title: Option<String>,
    pub word_count: Option<usize>,

    // Artifacts
    pub narration_path: Option<PathBuf>,
    pub music_path: Option<PathBuf>,
    pub final_audio_path: Option<PathBuf>,

    // Derived
    pub duration_seconds: Option<f64>,
    pub mood: Option<Mood>,

    // Control
    pub current_step: PipelineStep,
    pub error: Option<String>,
}

impl PipelineState {
    /// Fresh state for a new run
    pub fn new(story_id: Uuid, brief: &StoryBrief) -> Self {
        Self {
            story_id,
            theme: brief.theme.clone(),
            character_name: brief.character_name.clone(),
            age_group: brief.age_group.clone(),
            story_text: None,
            story_title: None,
            word_count: None,
            narration_path: None,
            music_path: None,
            final_audio_path: None,
            duration_seconds: None,
            mood: None,
            current_step: PipelineStep::Starting,
            error: None,
        }
    }

    /// Advance to the next step. Steps never move backwards; a stage that
    /// fails leaves the step where it last succeeded and records `error`
    /// instead.
    pub fn advance_to(&mut self, step: PipelineStep) {
        debug_assert!(
            step.sequence_index() > self.current_step.sequence_index(),
            "pipeline step moved backwards: {:?} -> {:?}",
            self.current_step,
            step
        );
        self.current_step = step;
    }

    /// Record a terminal stage failure. The first recorded error wins;
    /// later stages pass the state through unchanged.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
