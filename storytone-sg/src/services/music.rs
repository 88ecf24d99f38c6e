//! Background music generation
//!
//! Music is strictly nice-to-have: generators sit behind an ordered
//! fallback chain, and the pipeline's music stage swallows chain failure
//! rather than failing the run. The last link, `SilentMusicGenerator`,
//! produces a silent bed locally so the mix stage still has predictable
//! input whenever any generator at all succeeds.

use crate::services::{Mood, ProviderError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Sample spec for locally generated beds, matching the narration format
const SILENT_SAMPLE_RATE: u32 = 24_000;

/// Music generation directives for one mood
#[derive(Debug, Clone, Copy)]
pub struct MoodPrompt {
    pub prompt: &'static str,
    pub bpm: u32,
    pub temperature: f32,
}

impl MoodPrompt {
    /// Prompt table steering the generative model per mood
    pub fn for_mood(mood: Mood) -> MoodPrompt {
        match mood {
            Mood::Calm => MoodPrompt {
                prompt: "peaceful ambient background music, soft piano and strings, gentle flowing melodies",
                bpm: 70,
                temperature: 0.8,
            },
            Mood::Happy => MoodPrompt {
                prompt: "cheerful upbeat background music, bright acoustic guitar and light percussion, joyful melodies",
                bpm: 120,
                temperature: 0.9,
            },
            Mood::Dreamy => MoodPrompt {
                prompt: "ethereal magical background music, soft synths and bells, dreamy floating melodies",
                bpm: 60,
                temperature: 1.0,
            },
            Mood::Playful => MoodPrompt {
                prompt: "playful bouncy background music, xylophone and light drums, fun energetic melodies",
                bpm: 130,
                temperature: 1.1,
            },
            Mood::Adventure => MoodPrompt {
                prompt: "adventurous epic background music, orchestral strings and brass, heroic uplifting melodies",
                bpm: 110,
                temperature: 0.9,
            },
            Mood::Bedtime => MoodPrompt {
                prompt: "soothing lullaby background music, soft music box and gentle humming, sleepy calming melodies",
                bpm: 50,
                temperature: 0.7,
            },
        }
    }
}

/// Capability contract for background music generation
#[async_trait]
pub trait MusicGenerator: Send + Sync {
    /// Generate `duration_seconds` of music in `mood` into `output_path`
    async fn generate(
        &self,
        duration_seconds: u32,
        mood: Mood,
        output_path: &Path,
    ) -> Result<PathBuf, ProviderError>;

    /// Short name for fallback-chain logging
    fn name(&self) -> &'static str;
}

/// Remote generative-music client (Lyria-style prompt/duration API)
pub struct LyriaMusicGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl LyriaMusicGenerator {
    pub fn new(endpoint: String, api_key: String) -> storytone_common::Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(storytone_common::Error::Config(
                "Music endpoint not configured (STORYTONE_MUSIC_ENDPOINT)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| {
                storytone_common::Error::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, endpoint, api_key })
    }
}

#[async_trait]
impl MusicGenerator for LyriaMusicGenerator {
    async fn generate(
        &self,
        duration_seconds: u32,
        mood: Mood,
        output_path: &Path,
    ) -> Result<PathBuf, ProviderError> {
        let directive = MoodPrompt::for_mood(mood);

        tracing::info!(
            duration_seconds,
            mood = %mood,
            bpm = directive.bpm,
            "Requesting background music"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&serde_json::json!({
                "prompt": directive.prompt,
                "duration_seconds": duration_seconds,
                "bpm": directive.bpm,
                "temperature": directive.temperature,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Generation(format!("Music request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Generation(format!(
                "Music service returned HTTP {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Generation(format!("Music body read failed: {}", e)))?;

        if audio.is_empty() {
            return Err(ProviderError::Generation(
                "Music service returned an empty audio stream".to_string(),
            ));
        }

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProviderError::Generation(format!("Create output dir failed: {}", e)))?;
        }

        tokio::fs::write(output_path, &audio)
            .await
            .map_err(|e| ProviderError::Generation(format!("Write music failed: {}", e)))?;

        tracing::info!(path = %output_path.display(), bytes = audio.len(), "Music written");

        Ok(output_path.to_path_buf())
    }

    fn name(&self) -> &'static str {
        "lyria"
    }
}

/// Local fallback: a silent 24 kHz mono PCM bed of the requested length
pub struct SilentMusicGenerator;

#[async_trait]
impl MusicGenerator for SilentMusicGenerator {
    async fn generate(
        &self,
        duration_seconds: u32,
        mood: Mood,
        output_path: &Path,
    ) -> Result<PathBuf, ProviderError> {
        tracing::info!(duration_seconds, mood = %mood, "Writing silent music bed");

        let path = output_path.to_path_buf();
        tokio::task::spawn_blocking(move || write_silence(&path, duration_seconds))
            .await
            .map_err(|e| ProviderError::Generation(format!("Silence writer panicked: {}", e)))??;

        Ok(output_path.to_path_buf())
    }

    fn name(&self) -> &'static str {
        "silence"
    }
}

fn write_silence(path: &Path, duration_seconds: u32) -> Result<(), ProviderError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ProviderError::Generation(format!("Create output dir failed: {}", e)))?;
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SILENT_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| ProviderError::Generation(format!("Create WAV failed: {}", e)))?;

    let samples = u64::from(SILENT_SAMPLE_RATE) * u64::from(duration_seconds);
    for _ in 0..samples {
        writer
            .write_sample(0i16)
            .map_err(|e| ProviderError::Generation(format!("Write WAV failed: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| ProviderError::Generation(format!("Finalize WAV failed: {}", e)))
}

/// Ordered fallback chain over `MusicGenerator` implementations
///
/// Providers are tried in order; the first success wins. Errors are logged
/// per link; only the last error surfaces to the caller, and the music
/// stage downgrades even that to a diagnostic.
pub struct MusicFallbackChain {
    generators: Vec<Arc<dyn MusicGenerator>>,
}

impl MusicFallbackChain {
    pub fn new(generators: Vec<Arc<dyn MusicGenerator>>) -> Self {
        Self { generators }
    }

    pub async fn generate(
        &self,
        duration_seconds: u32,
        mood: Mood,
        output_path: &Path,
    ) -> Result<PathBuf, ProviderError> {
        let mut last_error: Option<ProviderError> = None;

        for generator in &self.generators {
            match generator.generate(duration_seconds, mood, output_path).await {
                Ok(path) => {
                    if last_error.is_some() {
                        tracing::info!(generator = generator.name(), "Music fallback succeeded");
                    }
                    return Ok(path);
                }
                Err(e) => {
                    tracing::warn!(
                        generator = generator.name(),
                        error = %e,
                        "Music generator failed, trying next in chain"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::Generation("No music generators configured".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingGenerator;

    #[async_trait]
    impl MusicGenerator for FailingGenerator {
        async fn generate(
            &self,
            _duration_seconds: u32,
            _mood: Mood,
            _output_path: &Path,
        ) -> Result<PathBuf, ProviderError> {
            Err(ProviderError::Generation("synthetic failure".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn mood_prompt_table_is_mood_specific() {
        assert_eq!(MoodPrompt::for_mood(Mood::Bedtime).bpm, 50);
        assert_eq!(MoodPrompt::for_mood(Mood::Playful).bpm, 130);
        assert!(MoodPrompt::for_mood(Mood::Adventure).prompt.contains("orchestral"));
        assert!(MoodPrompt::for_mood(Mood::Calm).prompt.contains("peaceful"));
    }

    #[tokio::test]
    async fn chain_falls_back_past_a_failing_primary() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("bed.wav");

        let chain = MusicFallbackChain::new(vec![
            Arc::new(FailingGenerator),
            Arc::new(SilentMusicGenerator),
        ]);

        let path = chain.generate(2, Mood::Calm, &output).await.unwrap();
        assert_eq!(path, output);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn chain_surfaces_the_last_error_when_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let chain = MusicFallbackChain::new(vec![
            Arc::new(FailingGenerator),
            Arc::new(FailingGenerator),
        ]);

        let result = chain.generate(2, Mood::Calm, &dir.path().join("bed.wav")).await;
        assert!(matches!(result, Err(ProviderError::Generation(_))));
    }

    #[tokio::test]
    async fn silent_bed_has_the_requested_duration() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("silence.wav");

        SilentMusicGenerator
            .generate(3, Mood::Bedtime, &output)
            .await
            .unwrap();

        let reader = hound::WavReader::open(&output).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, SILENT_SAMPLE_RATE);
        assert_eq!(spec.channels, 1);
        assert_eq!(reader.duration(), SILENT_SAMPLE_RATE * 3);
    }
}
