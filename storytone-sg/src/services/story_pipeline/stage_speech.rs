//! Stage 2: narration synthesis

use super::{ArtifactKind, StoryPipeline};
use crate::models::{PipelineState, PipelineStep};

impl StoryPipeline {
    /// Synthesize the narration for the produced story text.
    ///
    /// Passes the state through untouched when an earlier stage already
    /// failed. On synthesis failure the error is recorded and the step does
    /// not advance further.
    pub(super) async fn stage_speech(&self, mut state: PipelineState) -> PipelineState {
        if state.is_failed() {
            return state;
        }

        tracing::info!(story_id = %state.story_id, "Stage 2: generating narration");
        state.advance_to(PipelineStep::GeneratingAudio);

        let Some(story_text) = state.story_text.clone() else {
            state.fail("No story text available for narration");
            return state;
        };

        let output_path = self.artifact_path(state.story_id, ArtifactKind::Narration);

        match self
            .speech_synthesizer
            .synthesize(&story_text, &output_path)
            .await
        {
            Ok(path) => {
                tracing::info!(
                    story_id = %state.story_id,
                    path = %path.display(),
                    "Narration generated"
                );
                state.narration_path = Some(path);
            }
            Err(e) => {
                tracing::error!(
                    story_id = %state.story_id,
                    error = %e,
                    "Narration synthesis failed"
                );
                state.fail(e.to_string());
            }
        }

        state
    }
}
