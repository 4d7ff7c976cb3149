//! Configuration for the analysis pipeline
//!
//! Every tuning constant of the pipeline (window sizes, band edges, peak
//! detection heuristics, classifier thresholds) lives here as a named value.
//! Defaults are the empirically tuned constants the classifier was calibrated
//! against; a JSON file may override any subset of them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::features::spectral::band_label;
use crate::error::AnalysisError;

/// Complete analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub spectral: SpectralConfig,
    pub envelope: EnvelopeConfig,
    pub classifier: ClassifierConfig,
}

/// Frame-based spectral analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// FFT window length in samples (power of two)
    pub window_length: usize,
    /// Hop between successive windows in samples
    pub hop_length: usize,
    /// Added to each power bin before the log in spectral flatness
    pub flatness_epsilon: f32,
    /// Band boundaries in Hz; consecutive pairs form the named bands
    pub band_edges_hz: Vec<f32>,
    /// Power floor applied before converting band energy to dB
    pub band_power_floor: f32,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            window_length: 2048,
            hop_length: 512,
            flatness_epsilon: 1e-10,
            band_edges_hz: vec![0.0, 100.0, 500.0, 2000.0, 5000.0, 20000.0],
            band_power_floor: 1e-10,
        }
    }
}

/// RMS envelope, peak detection, decay and turbulence parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// RMS frame length in samples
    pub frame_length: usize,
    /// Hop between RMS frames in samples
    pub hop_length: usize,
    /// Minimum spacing between accepted peaks in milliseconds
    pub peak_min_spacing_ms: f32,
    /// Peak floor as a fraction of the envelope maximum
    pub peak_threshold_ratio: f32,
    /// Absolute lower bound of the peak floor
    pub peak_threshold_floor: f32,
    /// A peak must exceed `ratio * valley + offset`
    pub prominence_ratio: f32,
    pub prominence_offset: f32,
    /// Decay end is the last frame above this fraction of the maximum (-60 dB)
    pub decay_threshold_ratio: f32,
    /// Length of the resampled envelope vector
    pub output_length: usize,
    /// Linear floor before converting the envelope to dB
    pub db_floor: f32,
    /// Fewer frames than this in the fit window yields zero turbulence
    pub min_fit_frames: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
            peak_min_spacing_ms: 50.0,
            peak_threshold_ratio: 0.05,
            peak_threshold_floor: 1e-4,
            prominence_ratio: 1.55,
            prominence_offset: 1e-3,
            decay_threshold_ratio: 1e-3,
            output_length: 500,
            db_floor: 1e-5,
            min_fit_frames: 5,
        }
    }
}

/// Rule-based classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Peaks per second above which a signal counts as dense
    pub density_threshold: f32,
    /// Decay below this is Short
    pub short_decay_secs: f32,
    /// Decay below this (and not Short) is Medium
    pub medium_decay_secs: f32,
    /// Upper centroid bounds for Sub .. Bright; at or above the last is Very Bright
    pub centroid_bounds_hz: [f32; 7],
    /// Sub-band excess over the mid band that demotes Low to Very Low
    pub bass_excess_db: f32,
    /// Sub-band excess that further demotes Very Low to Sub
    pub bass_excess_severe_db: f32,
    /// Assumed energy of a band missing from the band map
    pub missing_band_db: f32,
    /// Band label compared as the bass reference
    pub sub_band_label: String,
    /// Band label compared as the mid reference
    pub mid_band_label: String,
    /// Upper turbulence bounds for Smooth, Textured, Grainy, Coarse
    pub texture_bounds: [f32; 4],
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            density_threshold: 4.0,
            short_decay_secs: 1.5,
            medium_decay_secs: 5.0,
            centroid_bounds_hz: [100.0, 400.0, 800.0, 1200.0, 2500.0, 4000.0, 6000.0],
            bass_excess_db: 12.0,
            bass_excess_severe_db: 24.0,
            missing_band_db: -100.0,
            sub_band_label: "0-100hz".to_string(),
            mid_band_label: "500-2000hz".to_string(),
            texture_bounds: [3.0, 4.0, 5.0, 6.0],
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing or malformed files fall back to the defaults with a warning,
    /// so a stale config never blocks an analysis run.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_strict(&path) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!(
                    "[Config] Failed to load {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load and validate configuration, surfacing every failure
    pub fn load_strict<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let contents = fs::read_to_string(&path)?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|err| AnalysisError::InvalidConfig {
                field: path.as_ref().display().to_string(),
                reason: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural constraints the pipeline relies on
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let spectral = &self.spectral;
        if spectral.window_length < 2 || !spectral.window_length.is_power_of_two() {
            return Err(invalid(
                "spectral.window_length",
                format!("must be a power of two >= 2 (got {})", spectral.window_length),
            ));
        }
        if spectral.hop_length == 0 {
            return Err(invalid("spectral.hop_length", "must be > 0".to_string()));
        }
        if spectral.band_edges_hz.len() < 2 {
            return Err(invalid(
                "spectral.band_edges_hz",
                "needs at least two edges".to_string(),
            ));
        }
        if !strictly_increasing(&spectral.band_edges_hz) {
            return Err(invalid(
                "spectral.band_edges_hz",
                "edges must be strictly increasing".to_string(),
            ));
        }

        let envelope = &self.envelope;
        if envelope.frame_length == 0 {
            return Err(invalid("envelope.frame_length", "must be > 0".to_string()));
        }
        if envelope.hop_length == 0 {
            return Err(invalid("envelope.hop_length", "must be > 0".to_string()));
        }
        if envelope.output_length == 0 {
            return Err(invalid("envelope.output_length", "must be > 0".to_string()));
        }
        if envelope.db_floor <= 0.0 {
            return Err(invalid("envelope.db_floor", "must be > 0".to_string()));
        }

        let classifier = &self.classifier;
        if !strictly_increasing(&classifier.centroid_bounds_hz) {
            return Err(invalid(
                "classifier.centroid_bounds_hz",
                "bounds must be strictly increasing".to_string(),
            ));
        }
        if !strictly_increasing(&classifier.texture_bounds) {
            return Err(invalid(
                "classifier.texture_bounds",
                "bounds must be strictly increasing".to_string(),
            ));
        }
        if classifier.short_decay_secs > classifier.medium_decay_secs {
            return Err(invalid(
                "classifier.short_decay_secs",
                "must not exceed medium_decay_secs".to_string(),
            ));
        }

        // Bass demotion compares two named bands; both must come from the edges
        let labels: Vec<String> = spectral
            .band_edges_hz
            .windows(2)
            .map(|pair| band_label(pair[0], pair[1]))
            .collect();
        for (field, label) in [
            ("classifier.sub_band_label", &classifier.sub_band_label),
            ("classifier.mid_band_label", &classifier.mid_band_label),
        ] {
            if !labels.contains(label) {
                return Err(invalid(
                    field,
                    format!("{:?} is not one of the configured bands {:?}", label, labels),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> AnalysisError {
    AnalysisError::InvalidConfig {
        field: field.to_string(),
        reason,
    }
}

fn strictly_increasing(values: &[f32]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}
