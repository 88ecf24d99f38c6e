//! Stage 3: background music

use super::{ArtifactKind, StoryPipeline, MUSIC_PADDING_SECONDS};
use crate::models::{PipelineState, PipelineStep};
use crate::services::Mood;

impl StoryPipeline {
    /// Request a background-music bed through the fallback chain.
    ///
    /// This stage never records an error: total chain failure leaves
    /// `music_path` empty with a diagnostic log line and the run continues
    /// to the mix stage. It still passes the state through untouched when an
    /// earlier stage already failed.
    pub(super) async fn stage_music(&self, mut state: PipelineState) -> PipelineState {
        if state.is_failed() {
            return state;
        }

        tracing::info!(story_id = %state.story_id, "Stage 3: generating background music");
        state.advance_to(PipelineStep::AddingMusic);

        // Narration duration drives the request; 0.0 when the file is absent
        let narration_duration = state
            .narration_path
            .as_deref()
            .map(|path| self.mixer.duration_seconds(path))
            .unwrap_or(0.0);

        let mood = Mood::classify(state.story_text.as_deref().unwrap_or(""));
        state.mood = Some(mood);

        let duration_seconds = narration_duration as u32 + MUSIC_PADDING_SECONDS;
        let output_path = self.artifact_path(state.story_id, ArtifactKind::Music);

        match self
            .music_chain
            .generate(duration_seconds, mood, &output_path)
            .await
        {
            Ok(path) => {
                tracing::info!(
                    story_id = %state.story_id,
                    mood = %mood,
                    path = %path.display(),
                    "Background music generated"
                );
                state.music_path = Some(path);
            }
            Err(e) => {
                tracing::warn!(
                    story_id = %state.story_id,
                    mood = %mood,
                    error = %e,
                    "All music generators failed; continuing without background music"
                );
            }
        }

        state
    }
}
