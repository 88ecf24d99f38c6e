//! Story mood classification
//!
//! Maps generated story text to one of six coarse mood labels used to steer
//! music generation. Keyword sets are checked in a fixed priority order and
//! the first match wins: a story that mentions both bedtime and adventure
//! words is a bedtime story.

use serde::{Deserialize, Serialize};

/// Coarse emotional label attached to generated text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Bedtime,
    Adventure,
    Happy,
    Dreamy,
    Playful,
    Calm,
}

/// Keyword sets in priority order. `Calm` is the fallback and carries no
/// keywords of its own.
const KEYWORD_SETS: &[(Mood, &[&str])] = &[
    (Mood::Bedtime, &["sleep", "night", "bedtime", "dream", "quiet"]),
    (Mood::Adventure, &["adventure", "brave", "quest", "journey", "explore"]),
    (Mood::Happy, &["happy", "laugh", "joy", "fun", "play"]),
    (Mood::Dreamy, &["magic", "wonder", "fairy", "enchant", "sparkle"]),
    (Mood::Playful, &["silly", "funny", "giggle", "bounce"]),
];

impl Mood {
    /// Classify story text by case-insensitive substring match against the
    /// priority-ordered keyword sets
    pub fn classify(story_text: &str) -> Mood {
        let lower = story_text.to_lowercase();
        for (mood, keywords) in KEYWORD_SETS {
            if keywords.iter().any(|keyword| lower.contains(keyword)) {
                return *mood;
            }
        }
        Mood::Calm
    }

    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Bedtime => "bedtime",
            Mood::Adventure => "adventure",
            Mood::Happy => "happy",
            Mood::Dreamy => "dreamy",
            Mood::Playful => "playful",
            Mood::Calm => "calm",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
