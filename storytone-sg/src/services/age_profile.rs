//! Age-group writing profiles
//!
//! Each profile sets the word-count band and the vocabulary/complexity
//! directives handed to the text generator. Unrecognized age groups fall
//! back to the `5-7` profile.

/// Writing profile for one target age group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeProfile {
    pub age_group: &'static str,
    pub min_words: u32,
    pub max_words: u32,
    pub complexity: &'static str,
    pub vocabulary: &'static str,
}

impl AgeProfile {
    /// Word band rendered for the generation prompt, e.g. "450-500"
    pub fn word_band(&self) -> String {
        format!("{}-{}", self.min_words, self.max_words)
    }
}

const PROFILES: &[AgeProfile] = &[
    AgeProfile {
        age_group: "3-5",
        min_words: 400,
        max_words: 450,
        complexity: "simple sentences with repetition",
        vocabulary: "basic vocabulary for toddlers",
    },
    AgeProfile {
        age_group: "5-7",
        min_words: 450,
        max_words: 500,
        complexity: "short, engaging sentences",
        vocabulary: "vocabulary appropriate for early readers",
    },
    AgeProfile {
        age_group: "7-10",
        min_words: 500,
        max_words: 600,
        complexity: "varied sentence structure with dialogue",
        vocabulary: "elementary-level vocabulary",
    },
];

const DEFAULT_AGE_GROUP: &str = "5-7";

/// Resolve the profile for an age group, defaulting to `5-7`
pub fn profile_for(age_group: &str) -> &'static AgeProfile {
    PROFILES
        .iter()
        .find(|p| p.age_group == age_group)
        .or_else(|| PROFILES.iter().find(|p| p.age_group == DEFAULT_AGE_GROUP))
        .expect("default age profile is always present")
}
