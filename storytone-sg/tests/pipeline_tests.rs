//! Pipeline stage-contract tests
//!
//! Run the orchestrator against scripted providers and check the terminal
//! state for each failure policy: clean run, fatal text/speech failures,
//! and the music stage's silent degradation.

mod helpers;

use std::sync::Arc;
use uuid::Uuid;

use helpers::{
    assert_artifact_name, test_pipeline, FailingMusicGenerator, FailingSpeechSynthesizer,
    FailingTextGenerator, ScriptedTextGenerator, WavSpeechSynthesizer,
};
use storytone_sg::models::{PipelineStep, StoryBrief};
use storytone_sg::services::{
    AudioMixer, Mood, MusicFallbackChain, StoryPipeline, WavAudioMixer,
};

fn squirrel_brief() -> StoryBrief {
    StoryBrief {
        theme: "a brave squirrel who learns to share".to_string(),
        character_name: None,
        age_group: "5-7".to_string(),
    }
}

#[tokio::test]
async fn clean_run_completes_with_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = test_pipeline(dir.path().to_path_buf());
    let story_id = Uuid::new_v4();

    let state = pipeline.run(story_id, &squirrel_brief()).await;

    assert_eq!(state.current_step, PipelineStep::Completed);
    assert!(state.error.is_none());

    // Produced content conforms to the 5-7 word band
    let word_count = state.word_count.unwrap();
    assert!(
        (450..=500).contains(&word_count),
        "word count {} outside band",
        word_count
    );
    assert_eq!(state.story_title.as_deref(), Some("The Sharing Squirrel"));

    // Mood is computed from the produced text, not the theme
    assert_eq!(state.mood, Some(Mood::Adventure));

    // All three artifacts exist and follow the naming convention
    let narration = state.narration_path.as_deref().unwrap();
    let music = state.music_path.as_deref().unwrap();
    let final_audio = state.final_audio_path.as_deref().unwrap();
    assert!(narration.exists());
    assert!(music.exists());
    assert!(final_audio.exists());
    assert_artifact_name(narration, story_id, "narration");
    assert_artifact_name(music, story_id, "music");
    assert_artifact_name(final_audio, story_id, "final");

    // Final duration equals the narration's duration
    assert!((state.duration_seconds.unwrap() - 2.0).abs() < 0.05);
}

#[tokio::test]
async fn text_failure_is_terminal_and_produces_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = StoryPipeline::new(
        Arc::new(FailingTextGenerator),
        Arc::new(WavSpeechSynthesizer { seconds: 2.0 }),
        MusicFallbackChain::new(vec![Arc::new(
            storytone_sg::services::SilentMusicGenerator,
        )]),
        Arc::new(WavAudioMixer::default()),
        dir.path().to_path_buf(),
    );

    let state = pipeline.run(Uuid::new_v4(), &squirrel_brief()).await;

    // Error text preserved verbatim from the provider
    assert_eq!(
        state.error.as_deref(),
        Some("generation failed: model unavailable")
    );
    // Step stays where the failing stage set it
    assert_eq!(state.current_step, PipelineStep::GeneratingText);

    // Later stages passed the state through untouched
    assert!(state.narration_path.is_none());
    assert!(state.music_path.is_none());
    assert!(state.final_audio_path.is_none());
    assert!(state.duration_seconds.is_none());
}

#[tokio::test]
async fn speech_failure_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = StoryPipeline::new(
        Arc::new(ScriptedTextGenerator),
        Arc::new(FailingSpeechSynthesizer),
        MusicFallbackChain::new(vec![Arc::new(
            storytone_sg::services::SilentMusicGenerator,
        )]),
        Arc::new(WavAudioMixer::default()),
        dir.path().to_path_buf(),
    );

    let state = pipeline.run(Uuid::new_v4(), &squirrel_brief()).await;

    assert_eq!(
        state.error.as_deref(),
        Some("speech synthesis failed: voice service unreachable")
    );
    assert_eq!(state.current_step, PipelineStep::GeneratingAudio);

    // Text survived, but no audio artifacts were produced
    assert!(state.story_text.is_some());
    assert!(state.narration_path.is_none());
    assert!(state.music_path.is_none());
    assert!(state.final_audio_path.is_none());
}

#[tokio::test]
async fn total_music_failure_still_completes_with_narration_only() {
    let dir = tempfile::tempdir().unwrap();
    // Every link in the chain fails; music is nice-to-have, narration is
    // essential
    let pipeline = StoryPipeline::new(
        Arc::new(ScriptedTextGenerator),
        Arc::new(WavSpeechSynthesizer { seconds: 3.0 }),
        MusicFallbackChain::new(vec![
            Arc::new(FailingMusicGenerator),
            Arc::new(FailingMusicGenerator),
        ]),
        Arc::new(WavAudioMixer::default()),
        dir.path().to_path_buf(),
    );

    let state = pipeline.run(Uuid::new_v4(), &squirrel_brief()).await;

    assert_eq!(state.current_step, PipelineStep::Completed);
    assert!(state.error.is_none());
    assert!(state.music_path.is_none());

    // The final artifact is the narration file itself
    let narration = state.narration_path.clone().unwrap();
    assert_eq!(state.final_audio_path.as_deref(), Some(narration.as_path()));

    // Duration is the narration's own duration
    let mixer = WavAudioMixer::default();
    let narration_duration = mixer.duration_seconds(&narration);
    assert!((state.duration_seconds.unwrap() - narration_duration).abs() < 1e-9);
    assert!((narration_duration - 3.0).abs() < 0.05);

    // Mood was still classified before the chain gave up
    assert_eq!(state.mood, Some(Mood::Adventure));
}

#[tokio::test]
async fn character_name_flows_into_the_brief() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = test_pipeline(dir.path().to_path_buf());

    let brief = StoryBrief {
        theme: "a lighthouse keeper's cat".to_string(),
        character_name: Some("Pip".to_string()),
        age_group: "7-10".to_string(),
    };

    let state = pipeline.run(Uuid::new_v4(), &brief).await;

    assert_eq!(state.character_name.as_deref(), Some("Pip"));
    assert_eq!(state.age_group, "7-10");
    assert_eq!(state.current_step, PipelineStep::Completed);
}
