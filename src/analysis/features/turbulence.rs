// Turbulence module - Irregularity of the decaying envelope
//
// A smooth reverb tail decays close to linearly in dB, so a least-squares
// line through the log envelope leaves small residuals. Discrete echoes
// separated by near-silence punch deep notches into the log envelope and
// blow the residual up. Turbulence is the RMS of those residuals in dB.

use crate::config::EnvelopeConfig;

/// Linear fit of the log envelope between its maximum and decay end
pub struct TurbulenceEstimator {
    db_floor: f32,
    min_fit_frames: usize,
}

impl TurbulenceEstimator {
    pub fn new(config: &EnvelopeConfig) -> Self {
        Self {
            db_floor: config.db_floor,
            min_fit_frames: config.min_fit_frames.max(2),
        }
    }

    /// Compute turbulence in dB
    ///
    /// The fit window starts at the envelope maximum (first occurrence) and
    /// ends, exclusive, at `max(decay_frame, peak + min_fit_frames)` clipped to
    /// the envelope. Returns 0 when the window holds fewer than
    /// `min_fit_frames` frames.
    pub fn estimate(&self, envelope: &[f32], decay_frame: usize) -> f32 {
        let Some(peak) = argmax(envelope) else {
            return 0.0;
        };

        let end = decay_frame
            .max(peak + self.min_fit_frames)
            .min(envelope.len());
        if end <= peak || end - peak < self.min_fit_frames {
            return 0.0;
        }

        let window: Vec<f64> = envelope[peak..end]
            .iter()
            .map(|&v| to_db(v, self.db_floor))
            .collect();
        rms_residual(&window) as f32
    }
}

/// `20·log10(max(value, floor))`
pub fn to_db(value: f32, floor: f32) -> f64 {
    20.0 * (value.max(floor) as f64).log10()
}

/// Index of the first maximum, `None` for an empty slice
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// RMS residual of the ordinary least-squares line through `(i, y[i])`
fn rms_residual(y: &[f64]) -> f64 {
    let n = y.len() as f64;
    if y.len() < 2 {
        return 0.0;
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &value) in y.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += value;
        sum_xy += x * value;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator != 0.0 {
        (n * sum_xy - sum_x * sum_y) / denominator
    } else {
        0.0
    };
    let intercept = (sum_y - slope * sum_x) / n;

    let squared_error: f64 = y
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let residual = value - (slope * i as f64 + intercept);
            residual * residual
        })
        .sum();

    (squared_error / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> TurbulenceEstimator {
        TurbulenceEstimator::new(&EnvelopeConfig::default())
    }

    #[test]
    fn test_exponential_decay_is_smooth() {
        // Exponential decay is a straight line in dB.
        let envelope: Vec<f32> = (0..100).map(|i| (-(i as f32) / 20.0).exp()).collect();
        let turbulence = estimator().estimate(&envelope, 99);
        assert!(turbulence < 1e-3, "got {}", turbulence);
    }

    #[test]
    fn test_gapped_echoes_are_turbulent() {
        let mut envelope = vec![0.0f32; 100];
        envelope[0] = 1.0;
        envelope[40] = 0.6;
        envelope[80] = 0.3;
        let turbulence = estimator().estimate(&envelope, 80);
        assert!(turbulence > 6.0, "got {}", turbulence);
    }

    #[test]
    fn test_short_window_yields_zero() {
        let envelope = vec![1.0, 0.5, 0.25, 0.1];
        assert_eq!(estimator().estimate(&envelope, 3), 0.0);
        assert_eq!(estimator().estimate(&[], 0), 0.0);
    }

    #[test]
    fn test_window_extends_to_minimum_length() {
        // decay_frame before peak + 5 still fits five frames
        let envelope = vec![1.0, 0.5, 0.25, 0.125, 0.0625, 0.03125];
        let turbulence = estimator().estimate(&envelope, 1);
        assert!(turbulence < 1e-3, "got {}", turbulence);
    }

    #[test]
    fn test_window_starts_at_first_maximum() {
        // Rising ramp before the maximum is ignored.
        let mut envelope = vec![0.0f32, 0.001, 0.01];
        envelope.extend((0..50).map(|i| (-(i as f32) / 10.0).exp()));
        let turbulence = estimator().estimate(&envelope, envelope.len());
        assert!(turbulence < 1e-3, "got {}", turbulence);
    }

    #[test]
    fn test_silence_is_flat_at_floor() {
        assert!(estimator().estimate(&vec![0.0; 20], 0) < 1e-6);
    }

    #[test]
    fn test_to_db_floor() {
        assert!((to_db(0.0, 1e-5) + 100.0).abs() < 1e-4);
        assert!(to_db(1.0, 1e-5).abs() < 1e-12);
    }

    #[test]
    fn test_rms_residual_of_known_points() {
        // Points 0, 2, 0, 2 fit y = 0.4x + 0.4; residuals ±0.4/±1.2 -> sqrt(0.8)
        let residual = rms_residual(&[0.0, 2.0, 0.0, 2.0]);
        assert!((residual - 0.8f64.sqrt()).abs() < 1e-9, "got {}", residual);
    }
}
