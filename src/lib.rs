// Impulse Analyzer - acoustic feature extraction and classification
// Deterministic single-pass DSP pipeline for recorded impulse responses

// Module declarations
pub mod analysis;
pub mod config;
pub mod debug;
pub mod error;
pub mod testing;

// Re-exports for convenience
pub use analysis::classifier::{
    BrightnessCategory, Classification, Classifier, DurationCategory, IrType, TextureCategory,
};
pub use analysis::features::{BandEnergies, FeatureExtractor, FeatureSet};
pub use analysis::waveform::Waveform;
pub use analysis::{analyze_samples, AnalysisResult, Analyzer};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, ErrorCode};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Public surface reachable from the crate root
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let waveform = Waveform::mono(vec![0.0; 16], 8_000).unwrap();
        assert!(analyzer.analyze(&waveform, None).is_ok());
    }
}
