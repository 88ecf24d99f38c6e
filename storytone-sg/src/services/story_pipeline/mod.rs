//! Story generation pipeline orchestrator
//!
//! # Stage Progression
//! Text -> Speech -> Music -> Mix
//!
//! Each run owns a fresh `PipelineState` and walks the four stages
//! unconditionally in fixed order; sequencing never branches. Every stage
//! applies its own short-circuit rule instead:
//!
//! - **Text** (`stage_text.rs`): story text + title via the text generator
//! - **Speech** (`stage_speech.rs`): narration synthesis; skipped after a
//!   prior failure
//! - **Music** (`stage_music.rs`): best-effort background bed through the
//!   fallback chain; never fails the run
//! - **Mix** (`stage_mix.rs`): final master; skipped after a prior failure
//!
//! The `run_generation` driver owns the record writes around a run: status
//! flip at start, projection of the terminal state at the end, and a
//! catch-all that turns any error escaping the stages into a `Failed`
//! projection so the record is always eventually updated.

use crate::config::ServiceConfig;
use crate::db;
use crate::models::{PipelineState, StoryBrief, StoryStatus};
use crate::services::{
    AudioMixer, AzureSpeechSynthesizer, GeminiTextGenerator, LyriaMusicGenerator,
    MusicFallbackChain, MusicGenerator, SilentMusicGenerator, SpeechSynthesizer, TextGenerator,
    WavAudioMixer,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

mod stage_mix;
mod stage_music;
mod stage_speech;
mod stage_text;

/// Music bed attenuation under the narration, in dB
const MUSIC_REDUCTION_DB: f32 = 20.0;

/// Extra seconds of music requested beyond the narration length
const MUSIC_PADDING_SECONDS: u32 = 5;

/// Artifact kinds in the `{story_id}_{timestamp}_{kind}.wav` naming scheme
#[derive(Debug, Clone, Copy)]
pub(crate) enum ArtifactKind {
    Narration,
    Music,
    Final,
}

impl ArtifactKind {
    fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Narration => "narration",
            ArtifactKind::Music => "music",
            ArtifactKind::Final => "final",
        }
    }
}

/// Pipeline orchestrator: owns the capability providers and the stage order
pub struct StoryPipeline {
    text_generator: Arc<dyn TextGenerator>,
    speech_synthesizer: Arc<dyn SpeechSynthesizer>,
    music_chain: MusicFallbackChain,
    mixer: Arc<dyn AudioMixer>,
    stories_dir: PathBuf,
}

impl StoryPipeline {
    pub fn new(
        text_generator: Arc<dyn TextGenerator>,
        speech_synthesizer: Arc<dyn SpeechSynthesizer>,
        music_chain: MusicFallbackChain,
        mixer: Arc<dyn AudioMixer>,
        stories_dir: PathBuf,
    ) -> Self {
        Self {
            text_generator,
            speech_synthesizer,
            music_chain,
            mixer,
            stories_dir,
        }
    }

    /// Build the production pipeline from service configuration
    pub fn from_config(config: &ServiceConfig) -> storytone_common::Result<Self> {
        let text_generator = GeminiTextGenerator::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
        )?;

        let speech_synthesizer = AzureSpeechSynthesizer::new(
            config.azure_speech_key.clone(),
            config.azure_speech_region.clone(),
            config.azure_voice_name.clone(),
        )?;

        let mut generators: Vec<Arc<dyn MusicGenerator>> = Vec::new();
        match &config.music_endpoint {
            Some(endpoint) => {
                generators.push(Arc::new(LyriaMusicGenerator::new(
                    endpoint.clone(),
                    config.music_api_key.clone().unwrap_or_default(),
                )?));
            }
            None => {
                tracing::warn!(
                    "No music endpoint configured; stories will get a silent music bed"
                );
            }
        }
        generators.push(Arc::new(SilentMusicGenerator));

        Ok(Self::new(
            Arc::new(text_generator),
            Arc::new(speech_synthesizer),
            MusicFallbackChain::new(generators),
            Arc::new(WavAudioMixer::default()),
            config.stories_dir(),
        ))
    }

    /// Execute one complete generation run
    ///
    /// Returns the terminal state for projection; never errors — stage
    /// failures are recorded in the state itself.
    pub async fn run(&self, story_id: Uuid, brief: &StoryBrief) -> PipelineState {
        tracing::info!(
            story_id = %story_id,
            theme = %brief.theme,
            age_group = %brief.age_group,
            "Starting story generation pipeline"
        );

        let state = PipelineState::new(story_id, brief);

        // Fixed stage order; each stage applies its own short-circuit rule
        let state = self.stage_text(state).await;
        let state = self.stage_speech(state).await;
        let state = self.stage_music(state).await;
        let state = self.stage_mix(state).await;

        tracing::info!(
            story_id = %state.story_id,
            step = ?state.current_step,
            failed = state.is_failed(),
            "Pipeline run finished"
        );

        state
    }

    /// Deterministic artifact path: `{story_id}_{timestamp}_{kind}.wav`.
    /// Timestamps make names unique per run, so reruns never collide with
    /// prior artifacts.
    pub(crate) fn artifact_path(&self, story_id: Uuid, kind: ArtifactKind) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.stories_dir
            .join(format!("{}_{}_{}.wav", story_id, timestamp, kind.as_str()))
    }
}

/// Drive one generation run for an existing story record
///
/// Spawned fire-and-forget, one task per run. Never returns an error: any
/// failure outside the stages lands in a terminal `Failed` projection.
pub async fn run_generation(db: SqlitePool, pipeline: Arc<StoryPipeline>, story_id: Uuid) {
    if let Err(e) = run_generation_inner(&db, &pipeline, story_id).await {
        tracing::error!(
            story_id = %story_id,
            error = %e,
            "Generation run failed outside the stages"
        );
        if let Err(update_err) =
            db::stories::mark_failed(&db, story_id, &e.to_string()).await
        {
            tracing::error!(
                story_id = %story_id,
                error = %update_err,
                "Failed to record run failure"
            );
        }
    }
}

async fn run_generation_inner(
    db: &SqlitePool,
    pipeline: &StoryPipeline,
    story_id: Uuid,
) -> anyhow::Result<()> {
    let record = db::stories::load_story(db, story_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Story not found: {}", story_id))?;

    db::stories::set_status(db, story_id, StoryStatus::GeneratingText).await?;

    let final_state = pipeline.run(story_id, &record.brief()).await;

    db::stories::project_final_state(db, story_id, &final_state).await?;

    tracing::info!(
        story_id = %story_id,
        failed = final_state.is_failed(),
        "Generation run projected onto story record"
    );

    Ok(())
}
