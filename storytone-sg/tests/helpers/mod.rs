//! Shared test fixtures: scripted and failing capability providers
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use storytone_sg::models::StoryBrief;
use storytone_sg::services::{
    GeneratedStory, Mood, MusicFallbackChain, MusicGenerator, ProviderError,
    SilentMusicGenerator, SpeechSynthesizer, StoryPipeline, TextGenerator, WavAudioMixer,
};

/// Deterministic story body: 460 words, adventure-keyword mood ("brave",
/// "quest"), no bedtime keywords
pub fn story_text() -> String {
    let sentence = "The brave squirrel set out on a quest to share. ";
    sentence.repeat(46).trim_end().to_string()
}

pub struct ScriptedTextGenerator;

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn generate(&self, _brief: &StoryBrief) -> Result<GeneratedStory, ProviderError> {
        let text = story_text();
        let word_count = text.split_whitespace().count();
        Ok(GeneratedStory {
            text,
            title: "The Sharing Squirrel".to_string(),
            word_count,
        })
    }
}

pub struct FailingTextGenerator;

#[async_trait]
impl TextGenerator for FailingTextGenerator {
    async fn generate(&self, _brief: &StoryBrief) -> Result<GeneratedStory, ProviderError> {
        Err(ProviderError::Generation("model unavailable".to_string()))
    }
}

/// Writes `seconds` of 24 kHz mono tone to the requested path
pub struct WavSpeechSynthesizer {
    pub seconds: f64,
}

#[async_trait]
impl SpeechSynthesizer for WavSpeechSynthesizer {
    async fn synthesize(
        &self,
        _story_text: &str,
        output_path: &Path,
    ) -> Result<PathBuf, ProviderError> {
        write_tone(output_path, 24_000, self.seconds, 0.4)
            .map_err(|e| ProviderError::Synthesis(e.to_string()))?;
        Ok(output_path.to_path_buf())
    }
}

pub struct FailingSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FailingSpeechSynthesizer {
    async fn synthesize(
        &self,
        _story_text: &str,
        _output_path: &Path,
    ) -> Result<PathBuf, ProviderError> {
        Err(ProviderError::Synthesis("voice service unreachable".to_string()))
    }
}

pub struct FailingMusicGenerator;

#[async_trait]
impl MusicGenerator for FailingMusicGenerator {
    async fn generate(
        &self,
        _duration_seconds: u32,
        _mood: Mood,
        _output_path: &Path,
    ) -> Result<PathBuf, ProviderError> {
        Err(ProviderError::Generation("music service unreachable".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Happy-path pipeline: scripted text, 2 s narration, silent music bed
pub fn test_pipeline(stories_dir: PathBuf) -> StoryPipeline {
    StoryPipeline::new(
        Arc::new(ScriptedTextGenerator),
        Arc::new(WavSpeechSynthesizer { seconds: 2.0 }),
        MusicFallbackChain::new(vec![Arc::new(SilentMusicGenerator)]),
        Arc::new(WavAudioMixer::default()),
        stories_dir,
    )
}

pub fn write_tone(
    path: &Path,
    sample_rate: u32,
    seconds: f64,
    amplitude: f32,
) -> Result<(), hound::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let samples = (f64::from(sample_rate) * seconds) as usize;
    for _ in 0..samples {
        writer.write_sample((amplitude * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()
}

/// Assert an artifact file name follows `{story_id}_{timestamp}_{kind}.wav`
pub fn assert_artifact_name(path: &Path, story_id: uuid::Uuid, kind: &str) {
    let name = path.file_name().unwrap().to_string_lossy();
    let prefix = format!("{}_", story_id);
    assert!(
        name.starts_with(&prefix),
        "artifact name {} does not start with the story id",
        name
    );
    let suffix = format!("_{}.wav", kind);
    assert!(
        name.ends_with(&suffix),
        "artifact name {} does not end with {}",
        name,
        suffix
    );

    // Timestamp segment: YYYYMMDD_HHMMSS
    let timestamp = &name[prefix.len()..name.len() - suffix.len()];
    assert_eq!(timestamp.len(), 15, "unexpected timestamp segment: {}", timestamp);
    assert_eq!(timestamp.as_bytes()[8], b'_');
    assert!(
        timestamp
            .chars()
            .enumerate()
            .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() }),
        "unexpected timestamp segment: {}",
        timestamp
    );
}
