// Classifier - heuristic rule-based impulse response classification
//
// This module implements a decision-table classifier that places an impulse
// response on four independent axes using features extracted by
// FeatureExtractor:
//
// - type: Reverb (continuous tail) or Delay (discrete, sparse echoes)
// - duration: from decay time
// - brightness: from spectral centroid, darkened for bass-heavy spectra
// - texture: from turbulence (decay-fit residual) and peak density
//
// All thresholds come from ClassifierConfig. Classification is a pure
// function of the features: no state, no randomness.

use std::fmt;

use crate::analysis::features::{BandEnergies, FeatureSet};
use crate::config::ClassifierConfig;
use crate::debug::pipeline_tracer;

/// Broad impulse response family
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IrType {
    /// Continuous reverberant tail
    Reverb,
    /// Multiple sparse echo taps
    Delay,
}

/// Decay time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DurationCategory {
    Short,
    Medium,
    Long,
}

/// Spectral centroid bucket, darkest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum BrightnessCategory {
    Sub,
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    #[serde(rename = "Low Mid")]
    LowMid,
    Mid,
    #[serde(rename = "High Mid")]
    HighMid,
    Bright,
    #[serde(rename = "Very Bright")]
    VeryBright,
}

/// Decay irregularity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TextureCategory {
    Smooth,
    Textured,
    Grainy,
    Coarse,
    /// Highly turbulent but sparse
    Energetic,
}

impl IrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrType::Reverb => "Reverb",
            IrType::Delay => "Delay",
        }
    }
}

impl DurationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationCategory::Short => "Short",
            DurationCategory::Medium => "Medium",
            DurationCategory::Long => "Long",
        }
    }
}

impl BrightnessCategory {
    /// Categories in ascending centroid order, matching `centroid_bounds_hz`
    pub const ASCENDING: [BrightnessCategory; 8] = [
        BrightnessCategory::Sub,
        BrightnessCategory::VeryLow,
        BrightnessCategory::Low,
        BrightnessCategory::LowMid,
        BrightnessCategory::Mid,
        BrightnessCategory::HighMid,
        BrightnessCategory::Bright,
        BrightnessCategory::VeryBright,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrightnessCategory::Sub => "Sub",
            BrightnessCategory::VeryLow => "Very Low",
            BrightnessCategory::Low => "Low",
            BrightnessCategory::LowMid => "Low Mid",
            BrightnessCategory::Mid => "Mid",
            BrightnessCategory::HighMid => "High Mid",
            BrightnessCategory::Bright => "Bright",
            BrightnessCategory::VeryBright => "Very Bright",
        }
    }
}

impl TextureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureCategory::Smooth => "Smooth",
            TextureCategory::Textured => "Textured",
            TextureCategory::Grainy => "Grainy",
            TextureCategory::Coarse => "Coarse",
            TextureCategory::Energetic => "Energetic",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(IrType, DurationCategory, BrightnessCategory, TextureCategory);

/// Four-way categorical description of an impulse response
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub ir_type: IrType,
    pub duration_category: DurationCategory,
    pub brightness_category: BrightnessCategory,
    pub texture_category: TextureCategory,
}

/// Classifier applies threshold rules to extracted features
pub struct Classifier {
    config: ClassifierConfig,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify a complete feature set
    pub fn classify(&self, features: &FeatureSet) -> Classification {
        self.classify_parts(
            features.peak_count,
            features.decay_time_secs,
            features.spectral_centroid,
            features.turbulence,
            &features.band_energies,
        )
    }

    /// Classify from the raw feature tuple
    ///
    /// Decision table:
    /// 1. density = peaks / decay (0 when decay is 0); dense if > threshold
    /// 2. duration from decay against the short/medium bounds
    /// 3. brightness from centroid, then bass-heavy demotion
    /// 4. texture from turbulence; above the last bound, dense -> Textured,
    ///    sparse -> Energetic
    /// 5. type = Delay iff more than one peak and not dense
    pub fn classify_parts(
        &self,
        peak_count: usize,
        decay_time_secs: f32,
        centroid: f32,
        turbulence: f32,
        bands: &BandEnergies,
    ) -> Classification {
        let density = self.density(peak_count, decay_time_secs);
        let is_high_density = density > self.config.density_threshold;

        let ir_type = if peak_count > 1 && !is_high_density {
            IrType::Delay
        } else {
            IrType::Reverb
        };

        let classification = Classification {
            ir_type,
            duration_category: self.classify_duration(decay_time_secs),
            brightness_category: self.classify_brightness(centroid, bands),
            texture_category: self.classify_texture(turbulence, is_high_density),
        };

        log::debug!(
            "[Classifier] peaks={} decay={:.3}s density={:.2} -> {:?}",
            peak_count,
            decay_time_secs,
            density,
            classification
        );
        pipeline_tracer::trace_classification(
            classification.ir_type.as_str(),
            classification.texture_category.as_str(),
            density,
            is_high_density,
        );

        classification
    }

    /// Peaks per second of decay, 0 when the decay time is 0
    pub fn density(&self, peak_count: usize, decay_time_secs: f32) -> f32 {
        if decay_time_secs > 0.0 {
            peak_count as f32 / decay_time_secs
        } else {
            0.0
        }
    }

    fn classify_duration(&self, decay_time_secs: f32) -> DurationCategory {
        if decay_time_secs < self.config.short_decay_secs {
            DurationCategory::Short
        } else if decay_time_secs < self.config.medium_decay_secs {
            DurationCategory::Medium
        } else {
            DurationCategory::Long
        }
    }

    /// Centroid bucket, then bass-heavy demotion
    ///
    /// Demotion runs in sequence: Low becomes Very Low when the sub band
    /// exceeds the mid band by more than `bass_excess_db`, and Very Low
    /// (including a just-demoted Low) becomes Sub beyond
    /// `bass_excess_severe_db`.
    fn classify_brightness(&self, centroid: f32, bands: &BandEnergies) -> BrightnessCategory {
        let index = self
            .config
            .centroid_bounds_hz
            .iter()
            .position(|&bound| centroid < bound)
            .unwrap_or(self.config.centroid_bounds_hz.len());
        let mut category = BrightnessCategory::ASCENDING[index];

        let band_db = |label: &str| bands.get(label).unwrap_or(self.config.missing_band_db);
        let bass_excess =
            band_db(&self.config.sub_band_label) - band_db(&self.config.mid_band_label);

        if category == BrightnessCategory::Low && bass_excess > self.config.bass_excess_db {
            category = BrightnessCategory::VeryLow;
        }
        if category == BrightnessCategory::VeryLow
            && bass_excess > self.config.bass_excess_severe_db
        {
            category = BrightnessCategory::Sub;
        }

        category
    }

    fn classify_texture(&self, turbulence: f32, is_high_density: bool) -> TextureCategory {
        let [smooth, textured, grainy, coarse] = self.config.texture_bounds;
        if turbulence < smooth {
            TextureCategory::Smooth
        } else if turbulence < textured {
            TextureCategory::Textured
        } else if turbulence < grainy {
            TextureCategory::Grainy
        } else if turbulence < coarse {
            TextureCategory::Coarse
        } else if is_high_density {
            TextureCategory::Textured
        } else {
            TextureCategory::Energetic
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
