//! Stage 1: story text generation

use super::StoryPipeline;
use crate::models::{PipelineState, PipelineStep, StoryBrief};

impl StoryPipeline {
    /// Generate story text and title from the brief.
    ///
    /// First stage, so there is no prior error to short-circuit on. On
    /// provider failure the error is recorded and the step stays where the
    /// stage set it.
    pub(super) async fn stage_text(&self, mut state: PipelineState) -> PipelineState {
        tracing::info!(story_id = %state.story_id, "Stage 1: generating story text");
        state.advance_to(PipelineStep::GeneratingText);

        let brief = StoryBrief {
            theme: state.theme.clone(),
            character_name: state.character_name.clone(),
            age_group: state.age_group.clone(),
        };

        match self.text_generator.generate(&brief).await {
            Ok(story) => {
                tracing::info!(
                    story_id = %state.story_id,
                    title = %story.title,
                    word_count = story.word_count,
                    "Story text generated"
                );
                state.story_text = Some(story.text);
                state.story_title = Some(story.title);
                state.word_count = Some(story.word_count);
            }
            Err(e) => {
                tracing::error!(
                    story_id = %state.story_id,
                    error = %e,
                    "Story text generation failed"
                );
                state.fail(e.to_string());
            }
        }

        state
    }
}
