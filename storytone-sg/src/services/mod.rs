//! Generation services
//!
//! Capability providers (text, speech, music, mixing) behind trait seams,
//! the mood classifier, and the pipeline orchestrator that drives them.

pub mod age_profile;
pub mod mixer;
pub mod mood;
pub mod music;
pub mod speech;
pub mod story_pipeline;
pub mod text_generator;

pub use mixer::{AudioMixer, WavAudioMixer};
pub use mood::Mood;
pub use music::{LyriaMusicGenerator, MusicFallbackChain, MusicGenerator, SilentMusicGenerator};
pub use speech::{AzureSpeechSynthesizer, SpeechSynthesizer};
pub use story_pipeline::{run_generation, StoryPipeline};
pub use text_generator::{GeminiTextGenerator, GeneratedStory, TextGenerator};

use thiserror::Error;

/// Errors raised by generation capability providers
///
/// Text and music providers fail with `Generation`, the synthesizer with
/// `Synthesis`, the mixer with `Mix`. The pipeline preserves the rendered
/// message verbatim when it projects a failure onto the story record.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Text or music provider failure
    #[error("generation failed: {0}")]
    Generation(String),

    /// Speech synthesis failure
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// Audio assembly failure
    #[error("audio mix failed: {0}")]
    Mix(String),
}
