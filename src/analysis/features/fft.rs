// FFT module - radix-2 Fast Fourier Transform
//
// In-place decimation-in-time Cooley-Tukey transform over split real and
// imaginary buffers. Each plan precomputes its bit-reversal permutation and
// twiddle table once; plans are cached per size and shared read-only across
// threads, so concurrent analyses of different buffers never recompute them.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use crate::error::AnalysisError;

/// Process-wide plan cache keyed by transform size
static PLANS: Lazy<Mutex<HashMap<usize, Arc<Radix2Fft>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Fetch (or build and cache) the plan for an `n`-point transform
pub fn plan_for(n: usize) -> Result<Arc<Radix2Fft>, AnalysisError> {
    let mut plans = PLANS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(plan) = plans.get(&n) {
        return Ok(Arc::clone(plan));
    }

    let plan = Arc::new(Radix2Fft::new(n)?);
    plans.insert(n, Arc::clone(&plan));
    log::debug!("[FFT] Planned {}-point transform", n);
    Ok(plan)
}

/// Transform `re`/`im` in place
///
/// # Panics
/// If the buffers differ in length or the length is not a power of two.
/// Both are caller defects; nothing is truncated or padded.
pub fn fft_in_place(re: &mut [f32], im: &mut [f32]) {
    assert_eq!(
        re.len(),
        im.len(),
        "real and imaginary buffers must have equal length"
    );
    match plan_for(re.len()) {
        Ok(plan) => plan.process(re, im),
        Err(err) => panic!("fft_in_place: {}", err),
    }
}

/// Magnitude spectrum of a real signal whose length is a power of two
///
/// Returns `len / 2 + 1` bins from DC to Nyquist.
pub fn magnitude_spectrum(signal: &[f32]) -> Result<Vec<f32>, AnalysisError> {
    Ok(plan_for(signal.len())?.magnitude_spectrum(signal))
}

/// Precomputed radix-2 transform for one power-of-two size
#[derive(Debug)]
pub struct Radix2Fft {
    size: usize,
    bit_reverse: Vec<usize>,
    /// cos(2πk/N) for k in 0..N/2
    cos_table: Vec<f32>,
    /// sin(2πk/N) for k in 0..N/2
    sin_table: Vec<f32>,
}

impl Radix2Fft {
    /// Build the permutation and twiddle tables for an `n`-point transform
    pub fn new(n: usize) -> Result<Self, AnalysisError> {
        if n == 0 || !n.is_power_of_two() {
            return Err(AnalysisError::InvalidTransformSize { size: n });
        }

        let half = n / 2;
        let (cos_table, sin_table): (Vec<f32>, Vec<f32>) = (0..half)
            .map(|k| {
                let angle = 2.0 * PI * k as f64 / n as f64;
                (angle.cos() as f32, angle.sin() as f32)
            })
            .unzip();

        Ok(Self {
            size: n,
            bit_reverse: bit_reverse_table(n),
            cos_table,
            sin_table,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform in place
    ///
    /// # Panics
    /// If either buffer length differs from the planned size.
    pub fn process(&self, re: &mut [f32], im: &mut [f32]) {
        let n = self.size;
        assert_eq!(re.len(), n, "real buffer length must match plan size");
        assert_eq!(im.len(), n, "imaginary buffer length must match plan size");

        for (i, &j) in self.bit_reverse.iter().enumerate() {
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    // e^{-2πik/len}
                    let wr = self.cos_table[k * stride];
                    let wi = -self.sin_table[k * stride];

                    let a = start + k;
                    let b = a + half;
                    let tr = re[b] * wr - im[b] * wi;
                    let ti = re[b] * wi + im[b] * wr;

                    re[b] = re[a] - tr;
                    im[b] = im[a] - ti;
                    re[a] += tr;
                    im[a] += ti;
                }
            }
            len <<= 1;
        }
    }

    /// Magnitude spectrum of a real-valued signal of exactly `size` samples
    ///
    /// # Returns
    /// `sqrt(re² + im²)` for bins `0..=size/2`
    pub fn magnitude_spectrum(&self, signal: &[f32]) -> Vec<f32> {
        let mut re = signal.to_vec();
        let mut im = vec![0.0f32; signal.len()];
        self.process(&mut re, &mut im);

        re[..=self.size / 2]
            .iter()
            .zip(&im[..=self.size / 2])
            .map(|(&r, &i)| (r * r + i * i).sqrt())
            .collect()
    }
}

/// Bit-reversed index for every position, built with a reversed counter:
/// clear the high set bits with a decrementing mask, then set the first clear one.
fn bit_reverse_table(n: usize) -> Vec<usize> {
    let mut table = vec![0usize; n];
    let mut j = 0usize;
    for slot in table.iter_mut().skip(1) {
        let mut mask = n >> 1;
        while j & mask != 0 {
            j &= !mask;
            mask >>= 1;
        }
        j |= mask;
        *slot = j;
    }
    table
}
