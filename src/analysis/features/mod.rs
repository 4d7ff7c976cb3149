// FeatureExtractor - DSP feature extraction for impulse response classification
//
// This module extracts the acoustic features used to tell discrete echoes
// from continuous reverberant tails, and to place a response on duration,
// brightness and texture scales.
//
// Module organization:
// - types: Data structures (FeatureSet, BandEnergies)
// - fft: Table-driven radix-2 FFT with a shared plan cache
// - spectral: Frequency-domain features (centroid, flatness, band energies)
// - envelope: Time-domain features (RMS envelope, peaks, decay time)
// - turbulence: Linear-decay fit residual over the envelope
// - mod.rs: Coordinator (FeatureExtractor)
//
// Features extracted:
// 1. RMS Energy: Root-mean-square of the whole normalized buffer
// 2. Spectral Centroid: Weighted mean frequency (brightness measure)
// 3. Spectral Flatness: Geometric / arithmetic mean of power (tonality measure)
// 4. Band Energies: Mean power per named frequency band, in dB
// 5. Peak Count: Salient envelope peaks (echo taps)
// 6. Decay Time: Time until the envelope drops 60 dB below its maximum
// 7. Turbulence: RMS residual of a linear dB fit to the decay

pub mod envelope;
pub mod fft;
pub mod spectral;
pub mod turbulence;
pub mod types;

pub use types::{BandEnergies, BandEnergy, FeatureSet, SpectralSummary};

use crate::analysis::waveform::rms;
use crate::config::AnalysisConfig;
use crate::debug::pipeline_tracer;
use crate::error::AnalysisError;
use envelope::{resample_linear, EnvelopeFeatures};
use spectral::SpectralFeatures;
use turbulence::TurbulenceEstimator;

/// FeatureExtractor coordinates the DSP feature extraction pipeline
///
/// Combines spectral analysis, envelope analysis and turbulence estimation
/// into a single interface. Holds only configuration and shared FFT tables,
/// so one extractor may serve any number of buffers at its sample rate.
pub struct FeatureExtractor {
    spectral_features: SpectralFeatures,
    envelope_features: EnvelopeFeatures,
    turbulence: TurbulenceEstimator,
    envelope_length: usize,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor for the specified sample rate
    ///
    /// # Errors
    /// `InvalidTransformSize` if the spectral window is not a power of two.
    pub fn new(sample_rate: u32, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            spectral_features: SpectralFeatures::new(sample_rate, &config.spectral)?,
            envelope_features: EnvelopeFeatures::new(sample_rate, &config.envelope),
            turbulence: TurbulenceEstimator::new(&config.envelope),
            envelope_length: config.envelope.output_length,
        })
    }

    /// Extract all features from a normalized buffer
    ///
    /// Order of computation:
    /// 1. RMS energy of the whole buffer
    /// 2. Spectral summary (centroid, flatness, band energies)
    /// 3. RMS envelope, peaks and decay time
    /// 4. Turbulence over the decaying part of the envelope
    /// 5. Envelope resampled to the configured output length
    ///
    /// Silence and buffers shorter than one analysis window are valid and
    /// produce zero-valued features.
    pub fn extract(&self, normalized: &[f32]) -> FeatureSet {
        let rms_energy = rms(normalized);

        let spectral = self.spectral_features.analyze(normalized);
        pipeline_tracer::trace_spectral(spectral.centroid, spectral.flatness, spectral.frame_count);

        let envelope = self.envelope_features.analyze(normalized);
        pipeline_tracer::trace_envelope(envelope.envelope.len(), envelope.decay_frame);
        pipeline_tracer::trace_peaks(&envelope.peak_indices, envelope.decay_time_secs);

        let turbulence = self
            .turbulence
            .estimate(&envelope.envelope, envelope.decay_frame);
        pipeline_tracer::trace_turbulence(turbulence);

        FeatureSet {
            rms_energy,
            spectral_centroid: spectral.centroid,
            spectral_flatness: spectral.flatness,
            peak_count: envelope.peak_count(),
            decay_time_secs: envelope.decay_time_secs,
            turbulence,
            band_energies: spectral.band_energies,
            envelope: resample_linear(&envelope.envelope, self.envelope_length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;

    /// Generate pure sine wave for testing
    fn generate_sine_wave(frequency: f32, duration_samples: usize) -> Vec<f32> {
        (0..duration_samples)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    /// Generate an exponentially decaying noise burst for testing
    fn generate_decaying_noise(duration_samples: usize, time_constant_secs: f32) -> Vec<f32> {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(42);
        let tau = time_constant_secs * SAMPLE_RATE as f32;
        (0..duration_samples)
            .map(|i| rng.gen_range(-1.0..1.0) * (-(i as f32) / tau).exp())
            .collect()
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(SAMPLE_RATE, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_sine_features() {
        let signal = generate_sine_wave(1000.0, SAMPLE_RATE as usize);
        let features = extractor().extract(&signal);

        assert!(
            (features.rms_energy - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3,
            "Expected RMS ~0.707, got {}",
            features.rms_energy
        );
        assert!(
            (features.spectral_centroid - 1000.0).abs() < 200.0,
            "Expected centroid near 1000 Hz, got {}",
            features.spectral_centroid
        );
        assert!(
            features.turbulence < 1.0,
            "Expected near-zero turbulence for constant amplitude, got {}",
            features.turbulence
        );
        assert_eq!(features.envelope.len(), 500);
        assert_eq!(features.band_energies.len(), 5);
    }

    #[test]
    fn test_decaying_noise_is_smooth_reverb_tail() {
        let signal = generate_decaying_noise(SAMPLE_RATE as usize * 2, 0.2);
        let features = extractor().extract(&signal);

        println!("Decaying noise turbulence: {} dB", features.turbulence);
        assert!(
            features.decay_time_secs > 0.5 && features.decay_time_secs < 2.0,
            "Expected decay time within the buffer, got {}",
            features.decay_time_secs
        );
        assert!(
            features.turbulence < 3.0,
            "Expected smooth decay, got turbulence {}",
            features.turbulence
        );
        assert!(features.spectral_flatness > 0.1);
    }

    #[test]
    fn test_extract_with_silence() {
        let features = extractor().extract(&vec![0.0; SAMPLE_RATE as usize]);

        assert_eq!(features.rms_energy, 0.0);
        assert_eq!(features.spectral_centroid, 0.0);
        assert_eq!(features.peak_count, 0);
        assert_eq!(features.decay_time_secs, 0.0);
        assert!(features.turbulence < 1e-6);
        assert!(features.envelope.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_extract_with_short_audio() {
        // Shorter than one analysis window: no frames, zero-valued features
        let signal = generate_sine_wave(1000.0, 512);
        let features = extractor().extract(&signal);

        assert!(features.rms_energy > 0.0);
        assert_eq!(features.spectral_centroid, 0.0);
        assert_eq!(features.spectral_flatness, 0.0);
        assert!(features.band_energies.is_empty());
        assert_eq!(features.peak_count, 0);
        assert_eq!(features.envelope, vec![0.0; 500]);
    }

    #[test]
    fn test_extractor_rejects_bad_window() {
        let mut config = AnalysisConfig::default();
        config.spectral.window_length = 3000;
        assert!(matches!(
            FeatureExtractor::new(SAMPLE_RATE, &config),
            Err(AnalysisError::InvalidTransformSize { size: 3000 })
        ));
    }
}
