// Spectral module - Frequency-domain feature extraction
//
// Slides a Hann-windowed frame across the normalized waveform, computes each
// frame's magnitude spectrum, and accumulates:
// - spectral centroid (mean over frames)
// - spectral flatness of the power spectrum (mean over frames)
// - an average magnitude spectrum, partitioned into named band energies
//
// Flatness is computed on mag² + ε, not on magnitudes. Classifier thresholds
// were tuned against this exact formula.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

use std::sync::Arc;

use super::fft::{plan_for, Radix2Fft};
use super::types::{BandEnergies, BandEnergy, SpectralSummary};
use crate::config::SpectralConfig;
use crate::error::AnalysisError;

/// Spectral feature computation over whole buffers
pub struct SpectralFeatures {
    sample_rate: u32,
    window_length: usize,
    hop_length: usize,
    flatness_epsilon: f32,
    band_edges_hz: Vec<f32>,
    band_power_floor: f32,
    /// Hann window (pre-computed)
    window: Vec<f32>,
    fft: Arc<Radix2Fft>,
}

impl SpectralFeatures {
    /// Create a spectral processor for one sample rate
    ///
    /// # Errors
    /// `InvalidTransformSize` if the configured window is not a power of two.
    pub fn new(sample_rate: u32, config: &SpectralConfig) -> Result<Self, AnalysisError> {
        let window_length = config.window_length;
        let fft = plan_for(window_length)?;

        Ok(Self {
            sample_rate,
            window_length,
            hop_length: config.hop_length.max(1),
            flatness_epsilon: config.flatness_epsilon,
            band_edges_hz: config.band_edges_hz.clone(),
            band_power_floor: config.band_power_floor,
            window: hann_window(window_length),
            fft,
        })
    }

    /// Run frame-based analysis over a normalized signal
    ///
    /// Returns an all-zero summary with no bands when the signal is shorter
    /// than one window.
    pub fn analyze(&self, samples: &[f32]) -> SpectralSummary {
        let n = self.window_length;
        let bins = n / 2 + 1;

        let mut average = vec![0.0f64; bins];
        let mut centroid_sum = 0.0f64;
        let mut flatness_sum = 0.0f64;
        let mut frame_count = 0usize;
        let mut windowed = vec![0.0f32; n];

        let mut start = 0usize;
        while start + n <= samples.len() {
            for ((out, &sample), &w) in windowed
                .iter_mut()
                .zip(&samples[start..start + n])
                .zip(&self.window)
            {
                *out = sample * w;
            }

            let spectrum = self.fft.magnitude_spectrum(&windowed);
            for (acc, &mag) in average.iter_mut().zip(&spectrum) {
                *acc += mag as f64;
            }
            centroid_sum += self.compute_centroid(&spectrum) as f64;
            flatness_sum += self.compute_flatness(&spectrum) as f64;

            frame_count += 1;
            start += self.hop_length;
        }

        if frame_count == 0 {
            return SpectralSummary::default();
        }

        let average: Vec<f32> = average
            .into_iter()
            .map(|sum| (sum / frame_count as f64) as f32)
            .collect();

        SpectralSummary {
            centroid: (centroid_sum / frame_count as f64) as f32,
            flatness: (flatness_sum / frame_count as f64) as f32,
            band_energies: self.compute_band_energies(&average),
            frame_count,
        }
    }

    /// Centre frequency of FFT bin `k`
    fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.window_length as f32
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_k × |X[k]|) / Σ|X[k]|, 0 for an all-zero spectrum
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let mut weighted_sum = 0.0f64;
        let mut magnitude_sum = 0.0f64;
        for (k, &mag) in spectrum.iter().enumerate() {
            weighted_sum += self.bin_frequency(k) as f64 * mag as f64;
            magnitude_sum += mag as f64;
        }

        if magnitude_sum > 0.0 {
            (weighted_sum / magnitude_sum) as f32
        } else {
            0.0
        }
    }

    /// Compute spectral flatness of the power spectrum
    ///
    /// Formula: flatness = geometric_mean(|X[k]|² + ε) / arithmetic_mean(|X[k]|² + ε)
    ///
    /// The geometric mean is taken as exp(mean(ln(x))) so no bin underflows.
    pub fn compute_flatness(&self, spectrum: &[f32]) -> f32 {
        if spectrum.is_empty() {
            return 0.0;
        }

        let epsilon = self.flatness_epsilon as f64;
        let mut log_sum = 0.0f64;
        let mut sum = 0.0f64;
        for &mag in spectrum {
            let power = (mag as f64) * (mag as f64) + epsilon;
            log_sum += power.ln();
            sum += power;
        }

        let count = spectrum.len() as f64;
        let arithmetic_mean = sum / count;
        if arithmetic_mean == 0.0 {
            return 0.0;
        }
        let geometric_mean = (log_sum / count).exp();

        (geometric_mean / arithmetic_mean) as f32
    }

    /// Partition an average spectrum into the configured bands
    ///
    /// Bands are half-open `[low, high)` except the last, which includes its
    /// upper edge. Each band reports `10·log10(max(mean(mag²), floor))`.
    pub fn compute_band_energies(&self, spectrum: &[f32]) -> BandEnergies {
        let band_count = self.band_edges_hz.len().saturating_sub(1);
        let floor = self.band_power_floor.max(f32::MIN_POSITIVE) as f64;

        let bands = self
            .band_edges_hz
            .windows(2)
            .enumerate()
            .map(|(index, edges)| {
                let (low, high) = (edges[0], edges[1]);
                let is_last = index + 1 == band_count;

                let mut power_sum = 0.0f64;
                let mut bins = 0usize;
                for (k, &mag) in spectrum.iter().enumerate() {
                    let freq = self.bin_frequency(k);
                    let in_band = freq >= low && (freq < high || (is_last && freq <= high));
                    if in_band {
                        power_sum += (mag as f64) * (mag as f64);
                        bins += 1;
                    }
                }

                let power = if bins > 0 {
                    power_sum / bins as f64
                } else {
                    0.0
                };

                BandEnergy {
                    label: band_label(low, high),
                    db: (10.0 * power.max(floor).log10()) as f32,
                }
            })
            .collect();

        BandEnergies::new(bands)
    }
}

/// `"<low>-<high>hz"` with integral edges printed without decimals
pub fn band_label(low_hz: f32, high_hz: f32) -> String {
    format!("{}-{}hz", low_hz, high_hz)
}

/// Symmetric Hann window
fn hann_window(length: usize) -> Vec<f32> {
    if length < 2 {
        return vec![1.0; length];
    }
    (0..length)
        .map(|i| {
            0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / (length as f32 - 1.0)).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const SAMPLE_RATE: u32 = 44_100;

    fn processor() -> SpectralFeatures {
        SpectralFeatures::new(SAMPLE_RATE, &SpectralConfig::default()).unwrap()
    }

    fn sine(frequency: f32, samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32).sin()
            })
            .collect()
    }

    fn noise(samples: usize) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(7);
        (0..samples).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_rejects_non_power_of_two_window() {
        let config = SpectralConfig {
            window_length: 1500,
            ..SpectralConfig::default()
        };
        assert!(SpectralFeatures::new(SAMPLE_RATE, &config).is_err());
    }

    #[test]
    fn test_frame_count_matches_hop_grid() {
        let summary = processor().analyze(&sine(440.0, 2048 + 512 * 3 + 100));
        assert_eq!(summary.frame_count, 4);
    }

    #[test]
    fn test_centroid_tracks_sine_frequency() {
        let low = processor().analyze(&sine(200.0, 22_050));
        let high = processor().analyze(&sine(6_000.0, 22_050));

        assert!(
            (low.centroid - 200.0).abs() < 100.0,
            "expected ~200 Hz, got {}",
            low.centroid
        );
        assert!(
            (high.centroid - 6_000.0).abs() < 300.0,
            "expected ~6000 Hz, got {}",
            high.centroid
        );
    }

    #[test]
    fn test_flatness_sine_vs_noise() {
        let tonal = processor().analyze(&sine(1_000.0, 22_050));
        let noisy = processor().analyze(&noise(22_050));

        assert!(
            tonal.flatness < 0.1,
            "expected tonal flatness < 0.1, got {}",
            tonal.flatness
        );
        assert!(
            noisy.flatness > 0.3,
            "expected noise flatness > 0.3, got {}",
            noisy.flatness
        );
        assert!((0.0..=1.0).contains(&noisy.flatness));
    }

    #[test]
    fn test_short_signal_yields_zero_summary() {
        let summary = processor().analyze(&sine(440.0, 2047));
        assert_eq!(summary, SpectralSummary::default());
        assert!(summary.band_energies.is_empty());
    }

    #[test]
    fn test_band_labels_partition_edges() {
        let summary = processor().analyze(&noise(8_192));
        let labels: Vec<&str> = summary.band_energies.labels().collect();
        assert_eq!(
            labels,
            vec![
                "0-100hz",
                "100-500hz",
                "500-2000hz",
                "2000-5000hz",
                "5000-20000hz"
            ]
        );
    }

    #[test]
    fn test_silence_bands_hit_power_floor() {
        let summary = processor().analyze(&vec![0.0; 4_096]);
        assert_eq!(summary.centroid, 0.0);
        for band in summary.band_energies.iter() {
            assert!((band.db + 100.0).abs() < 1e-3, "{} = {}", band.label, band.db);
        }
    }

    #[test]
    fn test_low_sine_energy_lands_in_low_band() {
        let summary = processor().analyze(&sine(60.0, 22_050));
        let sub = summary.band_energies.get("0-100hz").unwrap();
        let mid = summary.band_energies.get("500-2000hz").unwrap();
        assert!(sub > mid + 20.0, "sub {} dB vs mid {} dB", sub, mid);
    }

    #[test]
    fn test_band_without_bins_reports_floor() {
        let config = SpectralConfig {
            band_edges_hz: vec![0.0, 5.0, 10.0],
            ..SpectralConfig::default()
        };
        let features = SpectralFeatures::new(SAMPLE_RATE, &config).unwrap();
        // Bin spacing is ~21.5 Hz, so only DC falls in the first band.
        let bands = features.compute_band_energies(&[1.0; 1025]);
        assert!((bands.get("0-5hz").unwrap() - 0.0).abs() < 1e-6);
        assert!((bands.get("5-10hz").unwrap() + 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_band_label_format() {
        assert_eq!(band_label(0.0, 100.0), "0-100hz");
        assert_eq!(band_label(5000.0, 20000.0), "5000-20000hz");
    }
}
