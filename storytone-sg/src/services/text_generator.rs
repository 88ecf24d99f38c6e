//! Story text generation via Google Gemini
//!
//! Two independent `generateContent` calls per story: one for the narrative
//! seeded by the brief and the age profile, one for the title seeded by the
//! produced text.

use crate::models::StoryBrief;
use crate::services::{age_profile, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// How much of the story seeds the title call
const TITLE_SEED_CHARS: usize = 500;

/// Output of one successful text generation
#[derive(Debug, Clone)]
pub struct GeneratedStory {
    pub text: String,
    pub title: String,
    pub word_count: usize,
}

/// Capability contract for story text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, brief: &StoryBrief) -> Result<GeneratedStory, ProviderError>;
}

/// Gemini-backed text generator
pub struct GeminiTextGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: String,
}

impl GeminiTextGenerator {
    pub fn new(api_key: String, model: String) -> storytone_common::Result<Self> {
        if api_key.trim().is_empty() {
            return Err(storytone_common::Error::Config(
                "Gemini API key not configured (STORYTONE_GEMINI_API_KEY)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| {
                storytone_common::Error::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, api_key, model })
    }

    /// Build the narrative prompt from the brief and its age profile
    fn story_prompt(brief: &StoryBrief) -> String {
        let profile = age_profile::profile_for(&brief.age_group);
        let character_clause = brief
            .character_name
            .as_deref()
            .map(|name| format!("The main character is named {}.", name))
            .unwrap_or_default();

        format!(
            "You are an award-winning children's book author specializing in stories for ages {age}.\n\
             Write a {band} word story about: {theme}\n\
             \n\
             {character_clause}\n\
             \n\
             Requirements:\n\
             - Target age: {age} years old\n\
             - Length: {band} words (approximately 3-4 minutes when read aloud)\n\
             - Use {complexity}\n\
             - Vocabulary: {vocabulary}\n\
             - Include dialogue and descriptive language\n\
             - Create a clear beginning, middle, and end\n\
             - Include sensory details (sounds, sights, feelings)\n\
             - End with a comforting, positive conclusion\n\
             - Add a moral or gentle lesson naturally woven into the story\n\
             \n\
             Style Guidelines:\n\
             - Use repetition for rhythmic quality\n\
             - Include onomatopoeia where appropriate (whoosh, splash, rustle)\n\
             - Keep the tone warm, gentle, and engaging\n\
             - Make it suitable for reading aloud as bedtime stories\n\
             \n\
             Format:\n\
             Provide ONLY the story text, without any title, metadata, or formatting markers.\n\
             Start directly with the story narrative.\n",
            age = brief.age_group,
            band = profile.word_band(),
            theme = brief.theme,
            character_clause = character_clause,
            complexity = profile.complexity,
            vocabulary = profile.vocabulary,
        )
    }

    /// Build the title prompt, seeded by the opening of the produced text
    fn title_prompt(story_text: &str) -> String {
        let seed: String = story_text.chars().take(TITLE_SEED_CHARS).collect();
        format!(
            "Create a short, catchy title (max 10 words) for this children's story:\n\n\
             {}...\n\n\
             Provide ONLY the title, nothing else.",
            seed
        )
    }

    /// One `generateContent` round-trip returning the first candidate's text
    async fn generate_content(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Generation(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Generation(format!(
                "Gemini returned HTTP {}: {}",
                status, body
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Generation(format!("Gemini response parse failed: {}", e)))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::Generation("Gemini returned no candidates".to_string()))
    }
}

#[async_trait]
impl TextGenerator for GeminiTextGenerator {
    async fn generate(&self, brief: &StoryBrief) -> Result<GeneratedStory, ProviderError> {
        tracing::info!(
            theme = %brief.theme,
            age_group = %brief.age_group,
            model = %self.model,
            "Generating story text"
        );

        let text = self.generate_content(&Self::story_prompt(brief)).await?;

        // Title is a second, independent call seeded by the produced text
        let raw_title = self.generate_content(&Self::title_prompt(&text)).await?;
        let title = raw_title.replace(['"', '\''], "").trim().to_string();

        let word_count = text.split_whitespace().count();

        tracing::info!(word_count, title = %title, "Story text generated");

        Ok(GeneratedStory { text, title, word_count })
    }
}
