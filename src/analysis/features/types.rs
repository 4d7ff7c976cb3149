// Types module - Data structures for impulse response features
//
// This module defines the feature records produced by the extraction
// pipeline and consumed by the classifier.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Energy of one named frequency band
#[derive(Debug, Clone, PartialEq)]
pub struct BandEnergy {
    /// `"<low>-<high>hz"`, e.g. `"500-2000hz"`
    pub label: String,
    /// Mean bin power in decibels
    pub db: f32,
}

/// Band energies in ascending frequency order
///
/// Serializes as a JSON object keyed by band label, preserving band order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandEnergies(Vec<BandEnergy>);

impl BandEnergies {
    pub fn new(bands: Vec<BandEnergy>) -> Self {
        Self(bands)
    }

    /// Energy in dB for a band label, if present
    pub fn get(&self, label: &str) -> Option<f32> {
        self.0.iter().find(|band| band.label == label).map(|band| band.db)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|band| band.label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandEnergy> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f32)> for BandEnergies {
    /// Build from `(label, dB)` pairs
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, db)| BandEnergy { label, db })
                .collect(),
        )
    }
}

impl Serialize for BandEnergies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for band in &self.0 {
            map.serialize_entry(&band.label, &band.db)?;
        }
        map.end()
    }
}

/// Frame-averaged spectral descriptors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectralSummary {
    /// Mean spectral centroid in Hz
    pub centroid: f32,
    /// Mean spectral flatness (0.0 tonal to 1.0 noise-like)
    pub flatness: f32,
    /// Per-band energy of the average spectrum (empty if no frame fit)
    pub band_energies: BandEnergies,
    /// Number of analysis frames that contributed
    pub frame_count: usize,
}

/// Complete feature record for one impulse response
///
/// Every field is derived from the normalized waveform; the classifier
/// reads nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// RMS of the whole normalized waveform
    pub rms_energy: f32,

    /// Spectral centroid in Hz (brightness)
    pub spectral_centroid: f32,

    /// Spectral flatness in [0, 1] (texture)
    pub spectral_flatness: f32,

    /// Accepted envelope peaks (echo taps, including the direct sound)
    pub peak_count: usize,

    /// Time until the envelope falls below -60 dB of its maximum, in seconds
    pub decay_time_secs: f32,

    /// RMS residual (dB) of a linear fit to the decaying envelope
    ///
    /// Low for smooth exponential reverb tails, high when silence gaps
    /// between discrete echoes break the fit.
    pub turbulence: f32,

    /// Named band energies in dB
    pub band_energies: BandEnergies,

    /// RMS envelope resampled to a fixed length
    pub envelope: Vec<f32>,
}
