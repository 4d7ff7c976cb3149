//! Fixture specification + waveform sources for tests and the harness binary.
//!
//! Analysis tests need deterministic input with known acoustic character: a
//! sparse echo pattern, a smooth reverberant tail, tones, noise and silence.
//! This module defines the declarative `FixtureSpec` (serde, so fixtures can
//! live in JSON next to expectations), the synthetic generators, and WAV
//! read/write via `hound`.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use crate::analysis::waveform::{Waveform, MAX_CHANNELS};
use crate::error::AnalysisError;

/// Sample rate used when a fixture does not name one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Echo pattern rendered by [`SyntheticPattern::EchoTaps`]: (onset seconds, gain).
pub const ECHO_TAPS: [(f32, f32); 3] = [(0.0, 1.0), (0.5, 0.6), (1.0, 0.3)];

/// Length of each echo tap pulse.
pub const ECHO_PULSE_MS: u32 = 10;

/// Declarative description of a fixture waveform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureSpec {
    pub id: String,
    pub source: FixtureSource,
    #[serde(default = "default_spec_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
}

/// Where fixture samples come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixtureSource {
    /// Load PCM data from a WAV file on disk.
    WavFile { path: PathBuf },
    /// Generate PCM procedurally using deterministic patterns.
    Synthetic(SyntheticSpec),
}

/// Configuration for synthetic fixtures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticSpec {
    pub pattern: SyntheticPattern,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    /// Time for `DecayingNoise` to fall 60 dB
    #[serde(default = "default_rt60_secs")]
    pub rt60_secs: f32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Supported deterministic waveform patterns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SyntheticPattern {
    Sine,
    WhiteNoise,
    Silence,
    /// Short DC pulses at [`ECHO_TAPS`], silence in between
    EchoTaps,
    /// White noise under an exponential decay
    DecayingNoise,
}

impl SyntheticSpec {
    pub fn new(pattern: SyntheticPattern) -> Self {
        Self {
            pattern,
            frequency_hz: default_frequency_hz(),
            amplitude: default_amplitude(),
            rt60_secs: default_rt60_secs(),
            seed: default_seed(),
        }
    }

    /// Render `duration_ms` of mono samples
    pub fn render(&self, sample_rate: u32, duration_ms: u32) -> Vec<f32> {
        let frames = duration_frames(duration_ms, sample_rate);
        let rate = sample_rate as f32;
        let mut rng = StdRng::seed_from_u64(self.seed);

        match self.pattern {
            SyntheticPattern::Sine => (0..frames)
                .map(|i| self.amplitude * (2.0 * PI * self.frequency_hz * i as f32 / rate).sin())
                .collect(),
            SyntheticPattern::WhiteNoise => (0..frames)
                .map(|_| self.amplitude * rng.gen_range(-1.0f32..1.0))
                .collect(),
            SyntheticPattern::Silence => vec![0.0; frames],
            SyntheticPattern::EchoTaps => {
                let mut samples = vec![0.0; frames];
                let pulse = duration_frames(ECHO_PULSE_MS, sample_rate).max(1);
                for (onset_secs, gain) in ECHO_TAPS {
                    let start = (onset_secs * rate).round() as usize;
                    let end = (start + pulse).min(frames);
                    if start < end {
                        samples[start..end].fill(self.amplitude * gain);
                    }
                }
                samples
            }
            SyntheticPattern::DecayingNoise => {
                // ln(1000): amplitude falls 60 dB over rt60
                let rate_per_sec = 1000f32.ln() / self.rt60_secs.max(1e-3);
                (0..frames)
                    .map(|i| {
                        let envelope = (-rate_per_sec * i as f32 / rate).exp();
                        self.amplitude * envelope * rng.gen_range(-1.0f32..1.0)
                    })
                    .collect()
            }
        }
    }
}

impl FixtureSpec {
    /// Synthetic fixture with default sample rate, mono, and the given length
    pub fn synthetic(id: &str, pattern: SyntheticPattern, duration_ms: u32) -> Self {
        Self {
            id: id.to_string(),
            source: FixtureSource::Synthetic(SyntheticSpec::new(pattern)),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            duration_ms,
        }
    }

    /// Validate invariant expectations for downstream pipelines.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate {
                sample_rate: self.sample_rate,
            });
        }

        let channels = self.channels as usize;
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(AnalysisError::UnsupportedChannelLayout {
                channels,
                reason: format!("fixtures support 1..={} channels", MAX_CHANNELS),
            });
        }

        Ok(())
    }

    /// Produce the fixture waveform.
    ///
    /// Synthetic sources are rendered once and copied to every channel; WAV
    /// sources keep their own rate and layout.
    pub fn load(&self) -> Result<Waveform, AnalysisError> {
        self.validate()?;
        match &self.source {
            FixtureSource::WavFile { path } => read_wav(path),
            FixtureSource::Synthetic(spec) => {
                let mono = spec.render(self.sample_rate, self.duration_ms);
                Waveform::from_channels(vec![mono; self.channels as usize], self.sample_rate)
            }
        }
    }
}

fn default_spec_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_duration_ms() -> u32 {
    2_000
}

fn default_channels() -> u8 {
    1
}

fn default_frequency_hz() -> f32 {
    440.0
}

fn default_amplitude() -> f32 {
    0.8
}

fn default_rt60_secs() -> f32 {
    1.0
}

fn default_seed() -> u64 {
    0x5A5A_FFF0
}

fn duration_frames(duration_ms: u32, sample_rate: u32) -> usize {
    ((duration_ms as f32 / 1_000.0) * sample_rate as f32).round() as usize
}

/// Decode a WAV file, keeping its channel layout.
///
/// Integer PCM is scaled to [-1, 1) by its bit depth.
pub fn read_wav(path: &Path) -> Result<Waveform, AnalysisError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| AnalysisError::Io {
        reason: format!("failed to open {}: {err}", path.display()),
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AnalysisError::UnsupportedChannelLayout {
            channels: 0,
            reason: format!("{} has zero channels", path.display()),
        });
    }

    let read_error = |err: hound::Error| AnalysisError::Io {
        reason: format!("error reading {}: {err}", path.display()),
    };

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(read_error))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            bits @ (8 | 16 | 24 | 32) => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / scale).map_err(read_error))
                    .collect::<Result<Vec<f32>, _>>()?
            }
            bits => {
                return Err(AnalysisError::Io {
                    reason: format!(
                        "unsupported bits_per_sample={} for {}",
                        bits,
                        path.display()
                    ),
                })
            }
        },
    };

    Waveform::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)
}

/// Write a waveform as 32-bit float WAV.
pub fn write_wav(path: &Path, waveform: &Waveform) -> Result<(), AnalysisError> {
    let spec = hound::WavSpec {
        channels: waveform.channel_count() as u16,
        sample_rate: waveform.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let channels: Vec<&[f32]> = (0..waveform.channel_count())
        .filter_map(|index| waveform.channel(index))
        .collect();
    for frame in 0..waveform.frames() {
        for channel in &channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests;
