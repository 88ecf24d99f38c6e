//! WAV audio assembly
//!
//! Mixes the narration with a background-music bed: loop the bed to cover
//! the narration, trim to exactly narration length, attenuate, fade in and
//! out, overlay, peak-normalize, and write 16-bit mono PCM at the
//! narration's sample rate. All sample processing happens in f32 off the
//! async runtime.

use crate::services::ProviderError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use storytone_common::FadeCurve;

/// Music bed fade lengths under the opening and closing narration
const FADE_IN_SECONDS: f64 = 2.0;
const FADE_OUT_SECONDS: f64 = 3.0;

/// Peak headroom left by normalization, in dB below full scale
const NORMALIZE_HEADROOM_DB: f32 = 0.1;

/// Capability contract for audio assembly
#[async_trait]
pub trait AudioMixer: Send + Sync {
    /// Overlay `music_path` (attenuated by `music_reduction_db`) under
    /// `narration_path` and export to `output_path`. Returns the output path
    /// and the final duration in seconds.
    async fn mix(
        &self,
        narration_path: &Path,
        music_path: &Path,
        output_path: &Path,
        music_reduction_db: f32,
    ) -> Result<(PathBuf, f64), ProviderError>;

    /// Duration of an audio file in seconds; 0.0 when the file is absent or
    /// unreadable
    fn duration_seconds(&self, path: &Path) -> f64;
}

/// `hound`-backed WAV mixer
pub struct WavAudioMixer {
    fade_curve: FadeCurve,
}

impl WavAudioMixer {
    pub fn new(fade_curve: FadeCurve) -> Self {
        Self { fade_curve }
    }
}

impl Default for WavAudioMixer {
    fn default() -> Self {
        Self::new(FadeCurve::SCurve)
    }
}

#[async_trait]
impl AudioMixer for WavAudioMixer {
    async fn mix(
        &self,
        narration_path: &Path,
        music_path: &Path,
        output_path: &Path,
        music_reduction_db: f32,
    ) -> Result<(PathBuf, f64), ProviderError> {
        tracing::info!(
            narration = %narration_path.display(),
            music = %music_path.display(),
            "Mixing narration with background music"
        );

        let narration = narration_path.to_path_buf();
        let music = music_path.to_path_buf();
        let output = output_path.to_path_buf();
        let curve = self.fade_curve;

        let (path, duration) = tokio::task::spawn_blocking(move || {
            mix_files(&narration, &music, &output, music_reduction_db, curve)
        })
        .await
        .map_err(|e| ProviderError::Mix(format!("Mix task panicked: {}", e)))??;

        tracing::info!(
            path = %path.display(),
            duration_seconds = duration,
            "Audio mixed"
        );

        Ok((path, duration))
    }

    fn duration_seconds(&self, path: &Path) -> f64 {
        if !path.exists() {
            return 0.0;
        }
        match hound::WavReader::open(path) {
            Ok(reader) => {
                let spec = reader.spec();
                f64::from(reader.duration()) / f64::from(spec.sample_rate)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Duration query failed");
                0.0
            }
        }
    }
}

fn mix_files(
    narration_path: &Path,
    music_path: &Path,
    output_path: &Path,
    music_reduction_db: f32,
    fade_curve: FadeCurve,
) -> Result<(PathBuf, f64), ProviderError> {
    let (narration, sample_rate) = read_mono(narration_path)?;
    if narration.is_empty() {
        return Err(ProviderError::Mix(format!(
            "Narration is empty: {}",
            narration_path.display()
        )));
    }

    let (music_raw, music_rate) = read_mono(music_path)?;
    let mut music = resample(&music_raw, music_rate, sample_rate);

    // Loop the bed until it covers the narration, then trim to length
    if !music.is_empty() {
        let base = music.clone();
        while music.len() < narration.len() {
            music.extend_from_slice(&base);
        }
    }
    music.resize(narration.len(), 0.0);

    // Keep the bed in the background
    let gain = db_to_amplitude(-music_reduction_db);
    for sample in &mut music {
        *sample *= gain;
    }

    apply_fade_in(&mut music, sample_rate, FADE_IN_SECONDS, fade_curve);
    apply_fade_out(&mut music, sample_rate, FADE_OUT_SECONDS, fade_curve);

    // Overlay bed under narration
    let mut mixed: Vec<f32> = narration
        .iter()
        .zip(&music)
        .map(|(voice, bed)| voice + bed)
        .collect();

    normalize(&mut mixed);

    write_mono(output_path, &mixed, sample_rate)?;

    let duration = narration.len() as f64 / f64::from(sample_rate);
    Ok((output_path.to_path_buf(), duration))
}

/// Read a WAV file as normalized mono f32 samples
fn read_mono(path: &Path) -> Result<(Vec<f32>, u32), ProviderError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| ProviderError::Mix(format!("Open {} failed: {}", path.display(), e)))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| ProviderError::Mix(format!("Read {} failed: {}", path.display(), e)))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| ProviderError::Mix(format!("Read {} failed: {}", path.display(), e)))?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    if channels == 1 {
        return Ok((interleaved, spec.sample_rate));
    }

    // Downmix by averaging channels
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

fn write_mono(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), ProviderError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ProviderError::Mix(format!("Create output dir failed: {}", e)))?;
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| ProviderError::Mix(format!("Create {} failed: {}", path.display(), e)))?;

    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
        writer
            .write_sample(value)
            .map_err(|e| ProviderError::Mix(format!("Write {} failed: {}", path.display(), e)))?;
    }

    writer
        .finalize()
        .map_err(|e| ProviderError::Mix(format!("Finalize {} failed: {}", path.display(), e)))
}

/// Linear-interpolation resample of the music bed to the narration rate
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

fn apply_fade_in(samples: &mut [f32], sample_rate: u32, seconds: f64, curve: FadeCurve) {
    let fade_len = ((f64::from(sample_rate) * seconds) as usize).min(samples.len());
    if fade_len == 0 {
        return;
    }
    for i in 0..fade_len {
        samples[i] *= curve.fade_in_gain(i as f32 / fade_len as f32);
    }
}

fn apply_fade_out(samples: &mut [f32], sample_rate: u32, seconds: f64, curve: FadeCurve) {
    let fade_len = ((f64::from(sample_rate) * seconds) as usize).min(samples.len());
    if fade_len == 0 {
        return;
    }
    let start = samples.len() - fade_len;
    for i in 0..fade_len {
        samples[start + i] *= curve.fade_out_gain(i as f32 / fade_len as f32);
    }
}

/// Scale so the peak sits `NORMALIZE_HEADROOM_DB` below full scale
fn normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }
    let target = db_to_amplitude(-NORMALIZE_HEADROOM_DB);
    let scale = target / peak;
    for sample in samples {
        *sample *= scale;
    }
}

fn db_to_amplitude(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}
