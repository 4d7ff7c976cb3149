// Analysis module - Impulse response analysis pipeline
//
// This module orchestrates the complete single-pass analysis of a decoded
// impulse response and assembles the result record.
//
// Architecture:
// - Waveform: validated per-channel input
// - Pipeline: mixdown → normalize → FeatureExtractor → Classifier
// - Output: AnalysisResult, serialized to the external JSON shape
//
// The pipeline is synchronous and holds no per-analysis state, so
// independent buffers can be analyzed in parallel (`analyze_batch`).

use rayon::prelude::*;
use serde::{Serialize, Serializer};

use crate::config::AnalysisConfig;
use crate::debug::pipeline_tracer;
use crate::error::{log_analysis_error, AnalysisError};

pub mod classifier;
pub mod features;
pub mod waveform;

use classifier::{Classification, Classifier};
use features::{BandEnergies, FeatureExtractor, FeatureSet};
use waveform::{normalize, Waveform};

/// Complete result of one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub classification: Classification,
    pub analysis_data: AnalysisData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisData {
    pub file_meta: FileMeta,
    pub musical_features: MusicalFeatures,
    pub vectors: FeatureVectors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMeta {
    pub duration_seconds: f32,
    /// Caller-supplied identifier (e.g. file name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicalFeatures {
    pub rms_energy: f32,
    pub brightness_spectral_centroid: f32,
    pub texture_spectral_flatness: f32,
    pub peak_count: usize,
    /// Serialized as a two-decimal string with an `s` suffix, e.g. `"1.25s"`
    #[serde(rename = "estimated_decay_time", serialize_with = "serialize_seconds")]
    pub estimated_decay_time_secs: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVectors {
    pub amplitude_envelope: Vec<f32>,
    pub frequency_bands_db: BandEnergies,
}

fn serialize_seconds<S: Serializer>(secs: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_seconds(*secs))
}

/// `1.2345` -> `"1.23s"`
pub fn format_seconds(secs: f32) -> String {
    format!("{:.2}s", secs)
}

impl AnalysisResult {
    fn assemble(
        classification: Classification,
        features: FeatureSet,
        duration_seconds: f32,
        source: Option<&str>,
    ) -> Self {
        Self {
            classification,
            analysis_data: AnalysisData {
                file_meta: FileMeta {
                    duration_seconds,
                    source: source.map(str::to_string),
                },
                musical_features: MusicalFeatures {
                    rms_energy: features.rms_energy,
                    brightness_spectral_centroid: features.spectral_centroid,
                    texture_spectral_flatness: features.spectral_flatness,
                    peak_count: features.peak_count,
                    estimated_decay_time_secs: features.decay_time_secs,
                },
                vectors: FeatureVectors {
                    amplitude_envelope: features.envelope,
                    frequency_bands_db: features.band_energies,
                },
            },
        }
    }

    /// Pretty-printed JSON in the external result shape
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the analysis pipeline with one configuration
///
/// Holds no per-analysis state; `&Analyzer` is shared freely across threads.
pub struct Analyzer {
    config: AnalysisConfig,
    classifier: Classifier,
}

impl Analyzer {
    /// Create an analyzer after validating the configuration
    ///
    /// # Errors
    /// `InvalidConfig` if any structural constraint fails.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            classifier: Classifier::new(config.classifier.clone()),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one waveform
    ///
    /// Steps: mixdown to mono, peak-normalize, extract features, classify.
    /// `source` is carried into `file_meta` untouched.
    pub fn analyze(
        &self,
        waveform: &Waveform,
        source: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mono = waveform.mixdown();
        debug_assert!(!mono.is_empty(), "waveform guarantees at least one frame");

        let input_peak = mono.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        let normalized = normalize(&mono);
        pipeline_tracer::trace_normalized(waveform.channel_count(), waveform.frames(), input_peak);

        let extractor = FeatureExtractor::new(waveform.sample_rate(), &self.config)?;
        let features = extractor.extract(&normalized);
        let classification = self.classifier.classify(&features);

        log::info!(
            "[Analyzer] {} {:.2}s @ {} Hz: {} / {} / {} / {} (peaks={}, decay={:.2}s)",
            source.unwrap_or("<buffer>"),
            waveform.duration_seconds(),
            waveform.sample_rate(),
            classification.ir_type,
            classification.duration_category,
            classification.brightness_category,
            classification.texture_category,
            features.peak_count,
            features.decay_time_secs
        );

        Ok(AnalysisResult::assemble(
            classification,
            features,
            waveform.duration_seconds(),
            source,
        ))
    }

    /// Analyze many waveforms in parallel, preserving input order
    ///
    /// Each buffer succeeds or fails on its own; failures are logged.
    pub fn analyze_batch(&self, waveforms: &[Waveform]) -> Vec<Result<AnalysisResult, AnalysisError>> {
        waveforms
            .par_iter()
            .enumerate()
            .map(|(index, waveform)| {
                self.analyze(waveform, None).map_err(|err| {
                    log_analysis_error(&err, &format!("batch item {}", index));
                    err
                })
            })
            .collect()
    }
}

/// Analyze a mono buffer with the default configuration
///
/// # Errors
/// `EmptyInput` for zero samples, `InvalidSampleRate` for 0 Hz.
pub fn analyze_samples(samples: &[f32], sample_rate: u32) -> Result<AnalysisResult, AnalysisError> {
    let waveform = Waveform::mono(samples.to_vec(), sample_rate)?;
    Analyzer::new(AnalysisConfig::default())?.analyze(&waveform, None)
}
