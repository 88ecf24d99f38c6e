//! Stage 4: final mix

use super::{ArtifactKind, StoryPipeline, MUSIC_REDUCTION_DB};
use crate::models::{PipelineState, PipelineStep};

impl StoryPipeline {
    /// Assemble the final audio artifact.
    ///
    /// With a music bed, the mixer loops/trims/attenuates/fades it under the
    /// narration and normalizes the result. Without one, the narration file
    /// itself is the final artifact. Passes the state through untouched when
    /// an earlier stage already failed; its own fatal failures record the
    /// error.
    pub(super) async fn stage_mix(&self, mut state: PipelineState) -> PipelineState {
        if state.is_failed() {
            return state;
        }

        tracing::info!(story_id = %state.story_id, "Stage 4: mixing final audio");
        state.advance_to(PipelineStep::Finalizing);

        let Some(narration_path) = state.narration_path.clone() else {
            state.fail("No narration available to finalize");
            return state;
        };

        match state.music_path.clone() {
            Some(music_path) => {
                let output_path = self.artifact_path(state.story_id, ArtifactKind::Final);
                match self
                    .mixer
                    .mix(&narration_path, &music_path, &output_path, MUSIC_REDUCTION_DB)
                    .await
                {
                    Ok((path, duration)) => {
                        tracing::info!(
                            story_id = %state.story_id,
                            path = %path.display(),
                            duration_seconds = duration,
                            "Final audio created"
                        );
                        state.final_audio_path = Some(path);
                        state.duration_seconds = Some(duration);
                        state.advance_to(PipelineStep::Completed);
                    }
                    Err(e) => {
                        tracing::error!(
                            story_id = %state.story_id,
                            error = %e,
                            "Audio mixing failed"
                        );
                        state.fail(e.to_string());
                    }
                }
            }
            None => {
                // No bed to mix: the narration is the deliverable
                tracing::warn!(
                    story_id = %state.story_id,
                    "No music available, using narration only"
                );
                let duration = self.mixer.duration_seconds(&narration_path);
                state.final_audio_path = Some(narration_path);
                state.duration_seconds = Some(duration);
                state.advance_to(PipelineStep::Completed);
            }
        }

        state
    }
}
