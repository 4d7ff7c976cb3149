// Waveform - decoded input boundary of the analysis pipeline
//
// A waveform arrives already decoded (per-channel f32 samples plus a sample
// rate). Mono passes through, stereo is averaged sample-wise, and anything
// wider is rejected until a mixdown policy exists for it.

use crate::error::AnalysisError;

/// Most channels the mixdown knows how to fold
pub const MAX_CHANNELS: usize = 2;

/// Decoded, validated multi-channel audio
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Waveform {
    /// Build a waveform from per-channel sample arrays
    ///
    /// # Errors
    /// * `EmptyInput` - no channels, or zero samples per channel
    /// * `UnsupportedChannelLayout` - more than two channels or ragged lengths
    /// * `InvalidSampleRate` - sample rate of 0 Hz
    /// * `NonFiniteSample` - any NaN or infinite sample
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate { sample_rate });
        }
        if channels.len() > MAX_CHANNELS {
            return Err(AnalysisError::UnsupportedChannelLayout {
                channels: channels.len(),
                reason: format!("at most {} channels are supported", MAX_CHANNELS),
            });
        }

        let frames = match channels.first() {
            Some(first) => first.len(),
            None => return Err(AnalysisError::EmptyInput),
        };
        if channels.iter().any(|channel| channel.len() != frames) {
            return Err(AnalysisError::UnsupportedChannelLayout {
                channels: channels.len(),
                reason: "channels have different lengths".to_string(),
            });
        }
        if frames == 0 {
            return Err(AnalysisError::EmptyInput);
        }
        for (channel, samples) in channels.iter().enumerate() {
            if let Some(frame) = samples.iter().position(|s| !s.is_finite()) {
                return Err(AnalysisError::NonFiniteSample { channel, frame });
            }
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Single-channel convenience constructor
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::from_channels(vec![samples], sample_rate)
    }

    /// De-interleave decoder output (`L R L R ...`) into channels
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if channel_count == 0 || channel_count > MAX_CHANNELS {
            return Err(AnalysisError::UnsupportedChannelLayout {
                channels: channel_count,
                reason: format!("expected 1..={} interleaved channels", MAX_CHANNELS),
            });
        }
        if samples.len() % channel_count != 0 {
            return Err(AnalysisError::UnsupportedChannelLayout {
                channels: channel_count,
                reason: format!(
                    "{} samples do not divide evenly into {} channels",
                    samples.len(),
                    channel_count
                ),
            });
        }

        let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::from_channels(channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_seconds(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Fold to mono: pass-through for one channel, sample-wise mean for two
    pub fn mixdown(&self) -> Vec<f32> {
        match self.channels.as_slice() {
            [mono] => mono.clone(),
            [left, right] => left
                .iter()
                .zip(right)
                .map(|(&l, &r)| (l + r) * 0.5)
                .collect(),
            _ => unreachable!("channel count validated at construction"),
        }
    }
}

/// Rescale so the largest absolute sample is exactly 1.0
///
/// Silence stays all-zero rather than dividing by zero.
pub fn normalize(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak > 0.0 {
        samples.iter().map(|&s| s / peak).collect()
    } else {
        samples.to_vec()
    }
}

/// Root-mean-square of a whole buffer (0 for an empty one)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (energy / samples.len() as f64).sqrt() as f32
}
