// Envelope module - Time-domain envelope, peak and decay extraction
//
// Computes a frame-wise RMS envelope over the valid region of the signal
// (no edge padding), then derives from it:
// - echo taps: salient envelope peaks under threshold, spacing and
//   prominence constraints
// - decay time: last frame above -60 dB of the envelope maximum
// - a fixed-length resampled copy of the envelope for external consumers

use crate::config::EnvelopeConfig;

/// Result of envelope analysis over one buffer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvelopeAnalysis {
    /// Raw RMS envelope, one value per frame
    pub envelope: Vec<f32>,
    /// Frame indices of accepted peaks, ascending
    pub peak_indices: Vec<usize>,
    /// Last frame above the decay threshold (0 if none)
    pub decay_frame: usize,
    /// `decay_frame × hop / sample_rate`
    pub decay_time_secs: f32,
}

impl EnvelopeAnalysis {
    pub fn peak_count(&self) -> usize {
        self.peak_indices.len()
    }
}

/// Envelope feature computation functions
pub struct EnvelopeFeatures {
    sample_rate: u32,
    frame_length: usize,
    hop_length: usize,
    min_spacing_frames: usize,
    threshold_ratio: f32,
    threshold_floor: f32,
    prominence_ratio: f32,
    prominence_offset: f32,
    decay_threshold_ratio: f32,
}

impl EnvelopeFeatures {
    /// Create an envelope processor for one sample rate
    pub fn new(sample_rate: u32, config: &EnvelopeConfig) -> Self {
        let hop_length = config.hop_length.max(1);
        let spacing_frames =
            (config.peak_min_spacing_ms / 1000.0 * sample_rate as f32 / hop_length as f32).ceil();

        Self {
            sample_rate,
            frame_length: config.frame_length.max(1),
            hop_length,
            min_spacing_frames: (spacing_frames as usize).max(1),
            threshold_ratio: config.peak_threshold_ratio,
            threshold_floor: config.peak_threshold_floor,
            prominence_ratio: config.prominence_ratio,
            prominence_offset: config.prominence_offset,
            decay_threshold_ratio: config.decay_threshold_ratio,
        }
    }

    /// Minimum frame gap between two accepted peaks
    pub fn min_spacing_frames(&self) -> usize {
        self.min_spacing_frames
    }

    /// Full envelope pass: RMS envelope, peaks, decay
    pub fn analyze(&self, samples: &[f32]) -> EnvelopeAnalysis {
        let envelope = self.compute_rms_envelope(samples);
        let peak_indices = self.detect_peaks(&envelope);
        let decay_frame = self.find_decay_frame(&envelope);

        EnvelopeAnalysis {
            decay_time_secs: self.frames_to_seconds(decay_frame),
            envelope,
            peak_indices,
            decay_frame,
        }
    }

    /// Compute the RMS envelope over full frames only
    ///
    /// Frame `i` covers samples `[i·hop, i·hop + frame_length)`. A signal
    /// shorter than one frame yields an empty envelope.
    pub fn compute_rms_envelope(&self, samples: &[f32]) -> Vec<f32> {
        if samples.len() < self.frame_length {
            return Vec::new();
        }

        let frame_count = (samples.len() - self.frame_length) / self.hop_length + 1;
        (0..frame_count)
            .map(|i| {
                let start = i * self.hop_length;
                let energy: f64 = samples[start..start + self.frame_length]
                    .iter()
                    .map(|&s| (s as f64) * (s as f64))
                    .sum();
                (energy / self.frame_length as f64).sqrt() as f32
            })
            .collect()
    }

    /// Detect salient envelope peaks (echo taps)
    ///
    /// Scans left to right tracking the lowest value since the last accepted
    /// peak. Frame 0 counts as a peak when it clears the threshold and is not
    /// below frame 1 (direct sound at t=0). An interior frame is a candidate
    /// when it clears the threshold, is `>=` its left neighbour and `>` its
    /// right one; it is accepted when it is at least `min_spacing_frames`
    /// after the previous peak and exceeds `prominence_ratio × valley +
    /// prominence_offset`. Accepting resets the valley to the peak value.
    pub fn detect_peaks(&self, envelope: &[f32]) -> Vec<usize> {
        let Some(&first) = envelope.first() else {
            return Vec::new();
        };

        let max = envelope.iter().fold(0.0f32, |acc, &v| acc.max(v));
        let threshold = (max * self.threshold_ratio).max(self.threshold_floor);

        let mut peaks = Vec::new();
        let mut last_peak: Option<usize> = None;
        let mut valley = first;

        let first_is_peak = first > threshold && envelope.get(1).map_or(true, |&next| first >= next);
        if first_is_peak {
            peaks.push(0);
            last_peak = Some(0);
        }

        for i in 1..envelope.len().saturating_sub(1) {
            let value = envelope[i];
            let is_local_max =
                value > threshold && value >= envelope[i - 1] && value > envelope[i + 1];
            let far_enough = last_peak.map_or(true, |p| i - p >= self.min_spacing_frames);
            let prominent = value > self.prominence_ratio * valley + self.prominence_offset;

            if is_local_max && far_enough && prominent {
                peaks.push(i);
                last_peak = Some(i);
                valley = value;
            } else {
                valley = valley.min(value);
            }
        }

        peaks
    }

    /// Last frame whose value exceeds `decay_threshold_ratio × max` (-60 dB)
    ///
    /// Returns 0 when no frame qualifies (including silence).
    pub fn find_decay_frame(&self, envelope: &[f32]) -> usize {
        let max = envelope.iter().fold(0.0f32, |acc, &v| acc.max(v));
        let threshold = max * self.decay_threshold_ratio;
        envelope
            .iter()
            .rposition(|&value| value > threshold)
            .unwrap_or(0)
    }

    /// Envelope frame index to seconds
    pub fn frames_to_seconds(&self, frame: usize) -> f32 {
        (frame * self.hop_length) as f32 / self.sample_rate as f32
    }
}

/// Resample a sequence to `target_len` points by linear interpolation
///
/// Output point `i` samples the source at fractional index
/// `i × (len − 1) / (target_len − 1)`. An empty source yields zeros; a source
/// already of the target length is returned unchanged.
pub fn resample_linear(source: &[f32], target_len: usize) -> Vec<f32> {
    if source.is_empty() {
        return vec![0.0; target_len];
    }
    if source.len() == target_len {
        return source.to_vec();
    }
    if target_len == 1 {
        return vec![source[0]];
    }

    let last = source.len() - 1;
    let scale = last as f64 / (target_len - 1) as f64;
    (0..target_len)
        .map(|i| {
            let position = i as f64 * scale;
            let lo = (position.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let frac = (position - lo as f64) as f32;
            source[lo] * (1.0 - frac) + source[hi] * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;

    fn features() -> EnvelopeFeatures {
        EnvelopeFeatures::new(SAMPLE_RATE, &EnvelopeConfig::default())
    }

    #[test]
    fn test_envelope_length_formula() {
        let f = features();
        assert_eq!(f.compute_rms_envelope(&vec![0.5; 2047]).len(), 0);
        assert_eq!(f.compute_rms_envelope(&vec![0.5; 2048]).len(), 1);
        assert_eq!(f.compute_rms_envelope(&vec![0.5; 2048 + 511]).len(), 1);
        assert_eq!(f.compute_rms_envelope(&vec![0.5; 2048 + 512 * 10]).len(), 11);
    }

    #[test]
    fn test_envelope_of_constant_signal() {
        let envelope = features().compute_rms_envelope(&vec![-0.5; 10_000]);
        assert!(envelope.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_spacing_is_fifty_ms_in_frames() {
        // 50 ms at 44.1 kHz / 512 hop = 4.3 frames -> 5
        assert_eq!(features().min_spacing_frames(), 5);
    }

    #[test]
    fn test_first_frame_counts_as_direct_sound() {
        let envelope = vec![1.0, 0.5, 0.2, 0.1, 0.05, 0.0];
        assert_eq!(features().detect_peaks(&envelope), vec![0]);
    }

    #[test]
    fn test_rising_first_frame_is_not_a_peak() {
        let envelope = vec![0.5, 1.0, 0.2, 0.0];
        assert_eq!(features().detect_peaks(&envelope), vec![1]);
    }

    #[test]
    fn test_plateau_peak_taken_at_its_last_frame() {
        let mut envelope = vec![0.0; 20];
        envelope[10..14].fill(0.5);
        assert_eq!(features().detect_peaks(&envelope), vec![13]);
    }

    #[test]
    fn test_gentle_ripple_rejected_by_prominence() {
        // Decaying tail with 10% ripples: never 1.55x above the running valley.
        let envelope: Vec<f32> = (0..200)
            .map(|i| {
                let ripple = if i % 10 == 5 { 1.1 } else { 1.0 };
                (-(i as f32) / 40.0).exp() * ripple
            })
            .collect();
        assert_eq!(features().detect_peaks(&envelope), vec![0]);
    }

    #[test]
    fn test_rearticulation_accepted_at_low_level() {
        let mut envelope = vec![0.0; 60];
        envelope[0] = 1.0;
        envelope[30] = 0.06;
        assert_eq!(features().detect_peaks(&envelope), vec![0, 30]);
    }

    #[test]
    fn test_peaks_below_threshold_ignored() {
        let mut envelope = vec![0.0; 60];
        envelope[0] = 1.0;
        envelope[30] = 0.04;
        assert_eq!(features().detect_peaks(&envelope), vec![0]);
    }

    #[test]
    fn test_peaks_respect_min_spacing() {
        let mut envelope = vec![0.0; 40];
        envelope[0] = 1.0;
        envelope[3] = 0.8;
        envelope[20] = 0.8;
        envelope[23] = 0.9;
        let peaks = features().detect_peaks(&envelope);
        assert_eq!(peaks, vec![0, 20]);
        for pair in peaks.windows(2) {
            assert!(pair[1] - pair[0] >= features().min_spacing_frames());
        }
    }

    #[test]
    fn test_random_envelopes_never_violate_spacing() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let f = features();
        let spacing = f.min_spacing_frames();
        let mut rng = StdRng::seed_from_u64(0x0E57_5EED);

        for _ in 0..500 {
            let len = rng.gen_range(0..300);
            // Mix dense jitter with sparse bursts so both prominence paths run
            let sparse = rng.gen_bool(0.5);
            let envelope: Vec<f32> = (0..len)
                .map(|_| {
                    if sparse && rng.gen_bool(0.9) {
                        0.0
                    } else {
                        rng.gen_range(0.0f32..1.0)
                    }
                })
                .collect();

            let peaks = f.detect_peaks(&envelope);
            for pair in peaks.windows(2) {
                assert!(
                    pair[1] - pair[0] >= spacing,
                    "Peaks {:?} closer than {} frames in {:?}",
                    pair,
                    spacing,
                    envelope
                );
            }
            assert!(peaks.iter().all(|&index| index < envelope.len()));
        }
    }

    #[test]
    fn test_silence_has_no_peaks() {
        assert!(features().detect_peaks(&vec![0.0; 50]).is_empty());
        assert!(features().detect_peaks(&[]).is_empty());
    }

    #[test]
    fn test_decay_frame_is_last_above_minus_60_db() {
        let mut envelope = vec![0.0; 50];
        envelope[0] = 1.0;
        envelope[20] = 0.002;
        envelope[30] = 0.0009;
        let f = features();
        assert_eq!(f.find_decay_frame(&envelope), 20);
        assert!((f.frames_to_seconds(20) - 20.0 * 512.0 / 44_100.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_of_silence_is_zero() {
        let analysis = features().analyze(&vec![0.0; 10_000]);
        assert_eq!(analysis.decay_frame, 0);
        assert_eq!(analysis.decay_time_secs, 0.0);
        assert_eq!(analysis.peak_count(), 0);
    }

    #[test]
    fn test_resample_identity_and_empty() {
        let source = vec![0.1, 0.4, 0.2];
        assert_eq!(resample_linear(&source, 3), source);
        assert_eq!(resample_linear(&[], 500), vec![0.0; 500]);
    }

    #[test]
    fn test_resample_interpolates_linearly() {
        assert_eq!(resample_linear(&[0.0, 1.0], 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let down = resample_linear(&[0.0, 1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(down, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_resample_single_value_source() {
        assert_eq!(resample_linear(&[0.7], 4), vec![0.7; 4]);
    }
}
