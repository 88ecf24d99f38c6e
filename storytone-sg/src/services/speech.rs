//! Speech narration via Azure Cognitive Services text-to-speech
//!
//! The synthesizer wraps the story text in SSML prosody markup before
//! sending it; callers only see text in, WAV file out.

use crate::services::ProviderError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_AZURE_VOICE: &str = "en-US-JennyNeural";

/// Narration output format: 24 kHz 16-bit mono PCM WAV
const OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";

/// Storytelling prosody rate
const PROSODY_RATE: &str = "0.95";

/// Capability contract for narration synthesis
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `story_text` into `output_path`, returning the path written
    async fn synthesize(&self, story_text: &str, output_path: &Path)
        -> Result<PathBuf, ProviderError>;
}

/// Azure-backed speech synthesizer
pub struct AzureSpeechSynthesizer {
    client: reqwest::Client,
    subscription_key: String,
    region: String,
    voice_name: String,
}

impl AzureSpeechSynthesizer {
    pub fn new(
        subscription_key: String,
        region: String,
        voice_name: String,
    ) -> storytone_common::Result<Self> {
        if subscription_key.trim().is_empty() {
            return Err(storytone_common::Error::Config(
                "Azure Speech key not configured (STORYTONE_AZURE_SPEECH_KEY)".to_string(),
            ));
        }
        if region.trim().is_empty() {
            return Err(storytone_common::Error::Config(
                "Azure Speech region not configured (STORYTONE_AZURE_SPEECH_REGION)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| {
                storytone_common::Error::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, subscription_key, region, voice_name })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.region
        )
    }

    /// Wrap story text in SSML with gentle storytelling prosody
    fn create_ssml(&self, text: &str) -> String {
        format!(
            "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='en-US'>\
             <voice name='{voice}'>\
             <prosody rate='{rate}' pitch='medium'>{text}</prosody>\
             </voice>\
             </speak>",
            voice = self.voice_name,
            rate = PROSODY_RATE,
            text = escape_xml(text),
        )
    }
}

/// Minimal XML text escaping for SSML bodies
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeechSynthesizer {
    async fn synthesize(
        &self,
        story_text: &str,
        output_path: &Path,
    ) -> Result<PathBuf, ProviderError> {
        tracing::info!(
            characters = story_text.len(),
            voice = %self.voice_name,
            "Generating speech narration"
        );

        let ssml = self.create_ssml(story_text);

        let response = self
            .client
            .post(self.endpoint())
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", "storytone-sg")
            .body(ssml)
            .send()
            .await
            .map_err(|e| ProviderError::Synthesis(format!("Azure TTS request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Synthesis(format!(
                "Azure TTS returned HTTP {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Synthesis(format!("Azure TTS body read failed: {}", e)))?;

        if audio.is_empty() {
            return Err(ProviderError::Synthesis(
                "Azure TTS returned an empty audio stream".to_string(),
            ));
        }

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProviderError::Synthesis(format!("Create output dir failed: {}", e)))?;
        }

        tokio::fs::write(output_path, &audio)
            .await
            .map_err(|e| ProviderError::Synthesis(format!("Write narration failed: {}", e)))?;

        tracing::info!(path = %output_path.display(), bytes = audio.len(), "Narration written");

        Ok(output_path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> AzureSpeechSynthesizer {
        AzureSpeechSynthesizer::new(
            "test-key".to_string(),
            "eastus".to_string(),
            DEFAULT_AZURE_VOICE.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn ssml_carries_voice_and_prosody() {
        let ssml = synthesizer().create_ssml("Once upon a time.");
        assert!(ssml.contains("<voice name='en-US-JennyNeural'>"));
        assert!(ssml.contains("<prosody rate='0.95' pitch='medium'>"));
        assert!(ssml.contains("Once upon a time."));
    }

    #[test]
    fn ssml_escapes_markup_characters() {
        let ssml = synthesizer().create_ssml("Tom & Jerry <hid> in the attic");
        assert!(ssml.contains("Tom &amp; Jerry &lt;hid&gt; in the attic"));
    }

    #[test]
    fn endpoint_uses_the_region() {
        assert_eq!(
            synthesizer().endpoint(),
            "https://eastus.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }

    #[test]
    fn blank_credentials_are_rejected() {
        assert!(AzureSpeechSynthesizer::new(
            String::new(),
            "eastus".to_string(),
            DEFAULT_AZURE_VOICE.to_string()
        )
        .is_err());
        assert!(AzureSpeechSynthesizer::new(
            "key".to_string(),
            " ".to_string(),
            DEFAULT_AZURE_VOICE.to_string()
        )
        .is_err());
    }
}
